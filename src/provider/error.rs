//! Provider error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::resilience::TransientError;

/// Errors that can occur while calling a generation provider.
///
/// Each variant is a tag the retry loop and the HTTP layer switch on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Model overloaded: {0}")]
    Overloaded(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Content policy violation: {0}")]
    ContentPolicy(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Transient failures that are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::ServiceUnavailable(_)
                | ProviderError::Overloaded(_)
                | ProviderError::RateLimited(_)
                | ProviderError::QuotaExceeded(_)
                | ProviderError::InternalServerError(_)
                | ProviderError::BadGateway(_)
                | ProviderError::Timeout(_)
                | ProviderError::Network(_)
        )
    }

    /// Classify a non-success HTTP response from a provider.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body.trim().to_string()
        };
        let lower = detail.to_lowercase();

        match status {
            400 | 422 if mentions_content_policy(&lower) => ProviderError::ContentPolicy(detail),
            400 | 404 | 405 | 409 | 413 | 415 | 422 => ProviderError::InvalidRequest(detail),
            401 | 403 => ProviderError::Unauthorized(detail),
            408 | 504 => ProviderError::Timeout(detail),
            429 if lower.contains("quota") => ProviderError::QuotaExceeded(detail),
            429 => ProviderError::RateLimited(detail),
            500 => ProviderError::InternalServerError(detail),
            502 => ProviderError::BadGateway(detail),
            503 | 529 if lower.contains("overload") => ProviderError::Overloaded(detail),
            503 => ProviderError::ServiceUnavailable(detail),
            529 => ProviderError::Overloaded(detail),
            501..=599 => ProviderError::InternalServerError(detail),
            _ => ProviderError::Other(detail),
        }
    }

    /// Classify a free-text error from an SDK that only reports messages.
    ///
    /// Case-insensitive substring match. Only provider adapters should call
    /// this; everything past the adapter works with the tag.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        let detail = message.to_string();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["service unavailable", "service_unavailable", "503"]) {
            ProviderError::ServiceUnavailable(detail)
        } else if has(&["overloaded"]) {
            ProviderError::Overloaded(detail)
        } else if has(&["quota exceeded", "quota_exceeded", "resource_exhausted"]) {
            ProviderError::QuotaExceeded(detail)
        } else if has(&["rate limit", "rate_limit", "too many requests", "429"]) {
            ProviderError::RateLimited(detail)
        } else if has(&["internal server error", "internal_server_error", "500"]) {
            ProviderError::InternalServerError(detail)
        } else if has(&["bad gateway", "bad_gateway", "502"]) {
            ProviderError::BadGateway(detail)
        } else if has(&["timeout", "timed out"]) {
            ProviderError::Timeout(detail)
        } else if has(&["network error", "network_error", "connection reset", "econnreset"]) {
            ProviderError::Network(detail)
        } else if has(&["unauthorized", "invalid api key", "401"]) {
            ProviderError::Unauthorized(detail)
        } else if mentions_content_policy(&lower) {
            ProviderError::ContentPolicy(detail)
        } else {
            ProviderError::Other(detail)
        }
    }
}

fn mentions_content_policy(lower: &str) -> bool {
    ["content policy", "content_policy", "safety", "moderation"]
        .iter()
        .any(|n| lower.contains(n))
}

impl TransientError for ProviderError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }

    fn timed_out(after: Duration) -> Self {
        ProviderError::Timeout(format!("no response within {}ms", after.as_millis()))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::Other(format!("invalid provider response: {}", err))
        } else if err.is_builder() {
            ProviderError::InvalidRequest(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}
