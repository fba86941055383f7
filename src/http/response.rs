//! Response bodies.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::resilience::CircuitBreakerSnapshot;

/// Successful generation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaryResponse {
    pub success: bool,
    pub route: String,
    pub model: String,
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub rate_limit: RateLimitStatus,
}

/// The caller's standing in the current rate-limit window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub remaining: u32,
    /// Window reset, milliseconds since the Unix epoch.
    pub reset_time: u64,
}

/// Failure body shared by every route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// `GET /api/{route}`: dump of the route's in-memory resilience state.
/// Not a stable contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDump {
    pub route: String,
    pub circuit_breaker: CircuitBreakerSnapshot,
    pub rate_limiting: RateLimitingStatus,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitingStatus {
    pub active_users: usize,
    pub config: RateLimitSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub window_ms: u64,
    pub max_requests: u32,
}

impl From<&RateLimitConfig> for RateLimitSettings {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            window_ms: config.window_ms,
            max_requests: config.max_requests,
        }
    }
}

/// `GET /health`.
#[derive(Debug, Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub version: &'static str,
    pub circuits: Vec<CircuitBreakerSnapshot>,
}

/// Milliseconds since the Unix epoch, `offset` from now.
pub fn epoch_millis(offset: Duration) -> u64 {
    (SystemTime::now() + offset)
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
