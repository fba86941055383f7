//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! constraints. Every problem is reported, not just the first.

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::schema::{CircuitBreakerConfig, GatewayConfig, RateLimitConfig, RetryPolicy};
use crate::provider::is_valid_model;
use crate::resilience::retry_budget;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    match Url::parse(&config.provider.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "provider.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("provider.base_url", e.to_string())),
    }

    check_retry_policy("retries", &config.retries, &mut errors);
    check_breaker("circuit_breaker", &config.circuit_breaker, &mut errors);
    check_rate_limit("rate_limit", &config.rate_limit, &mut errors);

    if config.routes.is_empty() {
        errors.push(ValidationError::new("routes", "at least one route is required"));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let prefix = format!("routes[{}]", i);
        if route.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{prefix}.name"), "must not be empty"));
        } else if route.name.contains('/') {
            errors.push(ValidationError::new(format!("{prefix}.name"), "must not contain '/'"));
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{prefix}.name"),
                format!("duplicate route '{}'", route.name),
            ));
        }
        if !is_valid_model(&route.model) {
            errors.push(ValidationError::new(
                format!("{prefix}.model"),
                format!("'{}' is not a valid model name", route.model),
            ));
        }
        if let Some(policy) = &route.retries {
            check_retry_policy(&format!("{prefix}.retries"), policy, &mut errors);
        }
        if let Some(breaker) = &route.circuit_breaker {
            check_breaker(&format!("{prefix}.circuit_breaker"), breaker, &mut errors);
        }
        if let Some(limit) = &route.rate_limit {
            check_rate_limit(&format!("{prefix}.rate_limit"), limit, &mut errors);
        }

        let budget = retry_budget(&route.retry_policy(config));
        if config.timeouts.request_secs > 0 && budget > config.timeouts.request_timeout() {
            errors.push(ValidationError::new(
                format!("{prefix}.retries"),
                format!(
                    "worst case {}ms exceeds timeouts.request_secs ({}s)",
                    budget.as_millis(),
                    config.timeouts.request_secs
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_retry_policy(prefix: &str, policy: &RetryPolicy, errors: &mut Vec<ValidationError>) {
    if policy.base_delay_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.base_delay_ms"), "must be > 0"));
    }
    if policy.max_delay_ms < policy.base_delay_ms {
        errors.push(ValidationError::new(
            format!("{prefix}.max_delay_ms"),
            "must be >= base_delay_ms",
        ));
    }
    if !(policy.backoff_multiplier.is_finite() && policy.backoff_multiplier > 1.0) {
        errors.push(ValidationError::new(
            format!("{prefix}.backoff_multiplier"),
            "must be a finite number > 1",
        ));
    }
    if policy.per_attempt_timeout_ms == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.per_attempt_timeout_ms"),
            "must be > 0",
        ));
    }
}

fn check_breaker(prefix: &str, config: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    if config.failure_threshold == 0 {
        errors.push(ValidationError::new(format!("{prefix}.failure_threshold"), "must be > 0"));
    }
    if config.recovery_timeout_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.recovery_timeout_ms"), "must be > 0"));
    }
    if config.half_open_max_calls == 0 {
        errors.push(ValidationError::new(format!("{prefix}.half_open_max_calls"), "must be > 0"));
    }
}

fn check_rate_limit(prefix: &str, config: &RateLimitConfig, errors: &mut Vec<ValidationError>) {
    if config.window_ms == 0 {
        errors.push(ValidationError::new(format!("{prefix}.window_ms"), "must be > 0"));
    }
    if config.max_requests == 0 {
        errors.push(ValidationError::new(format!("{prefix}.max_requests"), "must be > 0"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = GatewayConfig::default();
        config.retries.base_delay_ms = 5_000;
        config.retries.max_delay_ms = 1_000;
        config.retries.backoff_multiplier = 1.0;
        config.rate_limit.max_requests = 0;
        config.provider.base_url = "ftp://provider".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "provider.base_url",
                "retries.max_delay_ms",
                "retries.backoff_multiplier",
                "rate_limit.max_requests",
            ]
        );
    }

    #[test]
    fn test_duplicate_route_names() {
        let mut config = GatewayConfig::default();
        let dup = config.routes[0].clone();
        config.routes.push(dup);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "routes[2].name");
    }

    #[test]
    fn test_request_deadline_must_cover_retries() {
        let mut config = GatewayConfig::default();
        // Default policy: 4 attempts * 30s + 1s + 2s + 4s = 127s.
        config.timeouts.request_secs = 60;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["routes[0].retries", "routes[1].retries"]);
        assert_eq!(
            errors[0].message,
            "worst case 127000ms exceeds timeouts.request_secs (60s)"
        );

        config.timeouts.request_secs = 127;
        assert!(validate_config(&config).is_ok());

        // A tighter per-route policy fits a shorter deadline.
        config.timeouts.request_secs = 60;
        for route in &mut config.routes {
            route.retries = Some(RetryPolicy {
                max_retries: 1,
                per_attempt_timeout_ms: 20_000,
                ..RetryPolicy::default()
            });
        }
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_route_model_must_be_a_single_segment() {
        let mut config = GatewayConfig::default();
        config.routes[0].model = "..".to_string();
        config.routes[1].model = "gen4?x=1".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["routes[0].model", "routes[1].model"]);
    }

    #[test]
    fn test_route_override_is_validated() {
        let mut config = GatewayConfig::default();
        config.routes = vec![RouteConfig {
            name: "edit".to_string(),
            model: "m".to_string(),
            retries: None,
            circuit_breaker: Some(CircuitBreakerConfig {
                failure_threshold: 0,
                ..CircuitBreakerConfig::default()
            }),
            rate_limit: None,
        }];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].to_string(), "routes[0].circuit_breaker.failure_threshold: must be > 0");
    }
}
