//! Circuit breaker for provider protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: provider assumed down, calls fail fast
//! - Half-Open: a limited number of trial calls probe for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: recovery timeout elapsed (evaluated lazily on next can_execute)
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails, or is dropped before it settles
//! Half-Open → Half-Open: trials outstanding for a full recovery timeout are
//!                        written off and new trials admitted
//! ```
//!
//! There is no background timer. Expiry of the open window is evaluated at the
//! next access, so a breaker nobody asks about stays Open in its snapshot.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::retries::TransientError;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

/// Failure of a call guarded by a breaker.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// Rejected without calling the provider.
    #[error("circuit breaker for '{route}' is open")]
    Open { route: String, retry_after: Duration },

    /// The guarded operation itself failed.
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    half_open_since: Option<Instant>,
    half_open_calls: u32,
}

/// Point-in-time view of a breaker, for the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerSnapshot {
    pub route: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_ms_ago: Option<u64>,
    pub half_open_calls: u32,
    pub config: BreakerSettings,
}

/// Breaker settings as reported by the health endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub half_open_max_calls: u32,
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout_ms: config.recovery_timeout_ms,
            half_open_max_calls: config.half_open_max_calls,
        }
    }
}

/// Consecutive-failure circuit breaker for one route.
#[derive(Debug)]
pub struct CircuitBreaker {
    route: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(route: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            route: route.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                half_open_since: None,
                half_open_calls: 0,
            }),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    // State stays consistent under poisoning: every mutation is a plain field store.
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Whether a call may proceed. Admitting a half-open trial consumes a slot.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = inner
                    .last_failure_at
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout());
                if recovered {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_since = Some(Instant::now());
                    inner.half_open_calls = 1;
                    tracing::info!(route = %self.route, "Circuit half-open, admitting trial call");
                    metrics::record_circuit_state(&self.route, CircuitState::HalfOpen);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    return true;
                }
                let stale = inner
                    .half_open_since
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout());
                if stale {
                    tracing::warn!(
                        route = %self.route,
                        outstanding = inner.half_open_calls,
                        "Half-open trials never settled, admitting a new trial"
                    );
                    inner.half_open_since = Some(Instant::now());
                    inner.half_open_calls = 1;
                }
                stale
            }
        }
    }

    /// Record a successful call.
    pub fn on_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.half_open_calls = 0;
        inner.half_open_since = None;
        if inner.state != CircuitState::Closed {
            inner.state = CircuitState::Closed;
            tracing::info!(route = %self.route, "Circuit closed");
            metrics::record_circuit_state(&self.route, CircuitState::Closed);
        }
    }

    /// Record a failed call.
    pub fn on_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());

        let trips = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold;
        if trips && inner.state != CircuitState::Open {
            inner.state = CircuitState::Open;
            inner.half_open_calls = 0;
            inner.half_open_since = None;
            tracing::warn!(
                route = %self.route,
                failures = inner.consecutive_failures,
                recovery_timeout_ms = self.config.recovery_timeout_ms,
                "Circuit opened"
            );
            metrics::record_circuit_state(&self.route, CircuitState::Open);
        }
    }

    /// Time until the breaker will admit a trial call. Zero when closed.
    pub fn retry_after(&self) -> Duration {
        let inner = self.lock();
        match inner.state {
            CircuitState::Closed => Duration::ZERO,
            CircuitState::Open => inner.last_failure_at.map_or(Duration::ZERO, |at| {
                self.config.recovery_timeout().saturating_sub(at.elapsed())
            }),
            // Trials are in flight; their outcome decides, at the latest
            // when they are written off.
            CircuitState::HalfOpen => inner.half_open_since.map_or(Duration::ZERO, |at| {
                self.config.recovery_timeout().saturating_sub(at.elapsed())
            }),
        }
    }

    /// Run `operation` under the breaker.
    ///
    /// Transient failures count against the circuit. Permanent failures
    /// (bad input, content policy) mean the provider answered, so they count
    /// as a success for the circuit while still being returned to the caller.
    /// A call dropped before it settles (client gone, request deadline) counts
    /// as a failure.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: TransientError,
    {
        if !self.can_execute() {
            metrics::record_circuit_rejection(&self.route);
            return Err(BreakerError::Open {
                route: self.route.clone(),
                retry_after: self.retry_after(),
            });
        }

        let mut pending = PendingOutcome {
            breaker: self,
            settled: false,
        };
        let result = operation().await;
        pending.settled = true;

        match result {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                if err.is_transient() {
                    self.on_failure();
                } else {
                    self.on_success();
                }
                Err(BreakerError::Inner(err))
            }
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.lock();
        CircuitBreakerSnapshot {
            route: self.route.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_ms_ago: inner
                .last_failure_at
                .map(|at| at.elapsed().as_millis() as u64),
            half_open_calls: inner.half_open_calls,
            config: BreakerSettings::from(&self.config),
        }
    }
}

/// Records a failure if an admitted call is dropped before it settles.
struct PendingOutcome<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Drop for PendingOutcome<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(route = %self.breaker.route, "Guarded call dropped before completion");
            self.breaker.on_failure();
        }
    }
}

/// Process-local breakers keyed by route name.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the breaker for `route`, creating it with `config` on first use.
    /// Later lookups return the same instance; `config` is ignored for them.
    pub fn get_or_create(&self, route: &str, config: &CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        let entry = self
            .breakers
            .entry(route.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(route, config.clone())));
        Arc::clone(entry.value())
    }

    /// Snapshots of every breaker, ordered by route.
    pub fn snapshots(&self) -> Vec<CircuitBreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.route.cmp(&b.route));
        snapshots
    }
}
