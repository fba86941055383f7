//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Request-level timeouts.
    pub timeouts: TimeoutConfig,

    /// Upstream generation provider.
    pub provider: ProviderConfig,

    /// Default retry policy for provider calls.
    pub retries: RetryPolicy,

    /// Default circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Default per-user rate limit.
    pub rate_limit: RateLimitConfig,

    /// Protected routes served under `/api/{name}`.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            provider: ProviderConfig::default(),
            retries: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            routes: default_routes(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Find a route by name.
    pub fn route(&self, name: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| r.name == name)
    }
}

/// The two route flavours the product ships with. The optimized route trips
/// its breaker sooner and recovers faster.
fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            name: "vary-character".to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            retries: None,
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 5,
                recovery_timeout_ms: 60_000,
                half_open_max_calls: 1,
            }),
            rate_limit: None,
        },
        RouteConfig {
            name: "vary-character-optimized".to_string(),
            model: "gen4_image".to_string(),
            retries: None,
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 3,
                recovery_timeout_ms: 30_000,
                half_open_max_calls: 1,
            }),
            rate_limit: None,
        },
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for the HTTP surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout towards the provider, in seconds.
    pub connect_secs: u64,

    /// Whole-request deadline for inbound requests, in seconds.
    /// Must cover every retry attempt plus backoff.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 180,
        }
    }
}

/// Upstream generation provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL; models are addressed as `{base_url}generate/{model}`.
    pub base_url: String,

    /// Bearer token. Overridden by `PROVIDER_API_KEY` when set.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000/".to_string(),
            api_key: None,
        }
    }
}

/// Retry-with-backoff policy for a single provider call site.
///
/// The delay after failed attempt `i` (0-based) is
/// `min(base_delay_ms * backoff_multiplier^i, max_delay_ms)`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero means a single attempt.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,

    /// Deadline for each individual attempt in milliseconds.
    pub per_attempt_timeout_ms: u64,
}

impl RetryPolicy {
    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.per_attempt_timeout_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            per_attempt_timeout_ms: 30_000,
        }
    }
}

/// Circuit breaker settings for one route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Time the circuit stays open after the last failure, in milliseconds.
    pub recovery_timeout_ms: u64,

    /// Trial calls admitted while half-open.
    pub half_open_max_calls: u32,
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            half_open_max_calls: 1,
        }
    }
}

/// Fixed-window, per-user rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests allowed per user per window.
    pub max_requests: u32,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 60_000,
            max_requests: 10,
        }
    }
}

/// A protected generation route. Unset sections fall back to the root config.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route name, served under `/api/{name}`.
    pub name: String,

    /// Provider model used by this route.
    pub model: String,

    #[serde(default)]
    pub retries: Option<RetryPolicy>,

    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl RouteConfig {
    pub fn retry_policy(&self, root: &GatewayConfig) -> RetryPolicy {
        self.retries.clone().unwrap_or_else(|| root.retries.clone())
    }

    pub fn breaker_config(&self, root: &GatewayConfig) -> CircuitBreakerConfig {
        self.circuit_breaker
            .clone()
            .unwrap_or_else(|| root.circuit_breaker.clone())
    }

    pub fn rate_limit_config(&self, root: &GatewayConfig) -> RateLimitConfig {
        self.rate_limit
            .clone()
            .unwrap_or_else(|| root.rate_limit.clone())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_overrides_fall_back_to_root() {
        let config = GatewayConfig::default();

        let vary = config.route("vary-character").unwrap();
        assert_eq!(vary.breaker_config(&config).failure_threshold, 5);
        assert_eq!(vary.retry_policy(&config), config.retries);
        assert_eq!(vary.rate_limit_config(&config).max_requests, 10);

        let optimized = config.route("vary-character-optimized").unwrap();
        assert_eq!(optimized.breaker_config(&config).failure_threshold, 3);
        assert_eq!(optimized.breaker_config(&config).recovery_timeout_ms, 30_000);
    }

    #[test]
    fn test_unknown_route() {
        assert!(GatewayConfig::default().route("does-not-exist").is_none());
    }
}
