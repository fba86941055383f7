//! Shared utilities for integration tests.

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use vary_gateway::config::{GatewayConfig, RateLimitConfig, RetryPolicy};
use vary_gateway::provider::{GenerationOutput, GenerationProvider, GenerationRequest, ProviderError};

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` produces `(status, body)` for each request; bodies are served as JSON.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        read_request(&mut socket).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Consume request head and `Content-Length` body so closing the socket
/// does not reset the connection under the client.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let Some(head_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&data[..head_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if data.len() >= head_end + 4 + content_length {
            return;
        }
    }
}

/// In-process provider that replays scripted results, then a fallback.
#[allow(dead_code)]
pub struct ScriptedProvider {
    calls: AtomicU32,
    script: Mutex<VecDeque<Result<GenerationOutput, ProviderError>>>,
    fallback: Result<GenerationOutput, ProviderError>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new(
        script: Vec<Result<GenerationOutput, ProviderError>>,
        fallback: Result<GenerationOutput, ProviderError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            script: Mutex::new(script.into()),
            fallback,
        })
    }

    pub fn always_ok() -> Arc<Self> {
        Self::new(Vec::new(), Ok(output()))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

#[allow(dead_code)]
pub fn output() -> GenerationOutput {
    GenerationOutput {
        outputs: vec!["https://cdn.example.com/variation-1.png".to_string()],
    }
}

/// Default config with fast retries so tests do not wait on real backoff.
#[allow(dead_code)]
pub fn fast_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.retries = RetryPolicy {
        max_retries: 3,
        base_delay_ms: 10,
        max_delay_ms: 50,
        backoff_multiplier: 2.0,
        per_attempt_timeout_ms: 2_000,
    };
    config.rate_limit = RateLimitConfig {
        enabled: true,
        window_ms: 60_000,
        max_requests: 10,
    };
    config
}
