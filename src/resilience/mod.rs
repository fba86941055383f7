//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Provider call for a route:
//!     → circuit_breaker.rs (fail fast while the route's circuit is open)
//!     → retries.rs (retry transient failures with backoff.rs delays)
//!     → timeouts.rs (every attempt has a deadline)
//! ```
//!
//! # Design Decisions
//! - One breaker per route, shared through `CircuitBreakerRegistry`
//! - Retries switch on error tags (`TransientError`), never on message text
//! - Deterministic backoff, no jitter
//! - State is in-memory and per process

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use backoff::{backoff_delay, retry_budget};
pub use circuit_breaker::{
    BreakerError, BreakerSettings, CircuitBreaker, CircuitBreakerRegistry, CircuitBreakerSnapshot,
    CircuitState,
};
pub use retries::{execute_with_retry, TransientError};
pub use timeouts::{ceil_secs, with_timeout};
