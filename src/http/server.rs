//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build per-route resilience state from config
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve until shutdown

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, RetryPolicy};
use crate::http::handlers::{liveness, route_health, vary_handler};
use crate::lifecycle::shutdown_signal;
use crate::provider::GenerationProvider;
use crate::resilience::{CircuitBreaker, CircuitBreakerRegistry};
use crate::security::FixedWindowRateLimiter;

/// Headroom between a route's own request deadline and the outer timeout layer,
/// so the route answers with its JSON error first.
const TIMEOUT_LAYER_GRACE: Duration = Duration::from_secs(5);

/// Resolved resilience state for one protected route.
pub struct RouteState {
    pub name: String,
    pub model: String,
    pub retry_policy: RetryPolicy,
    pub rate_limiter: FixedWindowRateLimiter,
    pub breaker: Arc<CircuitBreaker>,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<HashMap<String, Arc<RouteState>>>,
    pub provider: Arc<dyn GenerationProvider>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    /// Deadline for one guarded provider call, retries included.
    pub request_timeout: Duration,
}

impl AppState {
    /// Build isolated state: a fresh rate limiter per route and a fresh breaker registry.
    pub fn from_config(config: &GatewayConfig, provider: Arc<dyn GenerationProvider>) -> Self {
        let breakers = Arc::new(CircuitBreakerRegistry::new());

        let routes = config
            .routes
            .iter()
            .map(|route| {
                let state = RouteState {
                    name: route.name.clone(),
                    model: route.model.clone(),
                    retry_policy: route.retry_policy(config),
                    rate_limiter: FixedWindowRateLimiter::new(route.rate_limit_config(config)),
                    breaker: breakers.get_or_create(&route.name, &route.breaker_config(config)),
                };
                (route.name.clone(), Arc::new(state))
            })
            .collect();

        Self {
            routes: Arc::new(routes),
            provider,
            breakers,
            request_timeout: config.timeouts.request_timeout(),
        }
    }

    pub fn route(&self, name: &str) -> Option<Arc<RouteState>> {
        self.routes.get(name).cloned()
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    pub fn new(config: GatewayConfig, provider: Arc<dyn GenerationProvider>) -> Self {
        let state = AppState::from_config(&config, provider);
        let router = build_router(&config, state);
        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let routes: Vec<&str> = self.config.routes.iter().map(|r| r.name.as_str()).collect();
        tracing::info!(address = %addr, routes = ?routes, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/api/{route}", get(route_health).post(vary_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                .layer(TimeoutLayer::new(
                    config.timeouts.request_timeout() + TIMEOUT_LAYER_GRACE,
                )),
        )
}
