//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): handler latency by route
//! - `gateway_provider_retries_total` (counter): backoff sleeps taken
//! - `gateway_rate_limited_total` (counter): rejected by the rate limiter
//! - `gateway_circuit_rejections_total` (counter): rejected by an open circuit
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_provider_retry() {
    metrics::counter!("gateway_provider_retries_total").increment(1);
}

pub fn record_rate_limited(route: &str) {
    metrics::counter!("gateway_rate_limited_total", "route" => route.to_string()).increment(1);
}

pub fn record_circuit_rejection(route: &str) {
    metrics::counter!("gateway_circuit_rejections_total", "route" => route.to_string())
        .increment(1);
}

pub fn record_circuit_state(route: &str, state: CircuitState) {
    metrics::gauge!("gateway_circuit_state", "route" => route.to_string()).set(state.as_gauge());
}
