//! Retry with exponential backoff.
//!
//! # Responsibilities
//! - Bound each attempt with the policy's per-attempt timeout
//! - Classify failures through [`TransientError`] (a tag check, no message parsing)
//! - Sleep for the deterministic backoff delay between attempts
//! - Hand the last error back unchanged once the policy is exhausted

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryPolicy;
use crate::observability::metrics;
use crate::resilience::backoff::backoff_delay;
use crate::resilience::timeouts::with_timeout;

/// Errors that can tell whether trying again might help.
pub trait TransientError: Sized {
    /// True for failures worth retrying (overload, rate limit, network, timeout).
    fn is_transient(&self) -> bool;

    /// The error reported when an attempt exceeds its deadline.
    fn timed_out(after: Duration) -> Self;
}

/// Run `operation` until it succeeds, fails permanently, or the policy runs out.
///
/// `operation` is invoked at most `policy.max_retries + 1` times.
pub async fn execute_with_retry<T, E, F, Fut>(mut operation: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: TransientError + Display,
{
    let deadline = policy.per_attempt_timeout();
    let mut attempt: u32 = 0;

    loop {
        match with_timeout(deadline, operation()).await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "Provider call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_transient() => {
                tracing::warn!(attempt = attempt + 1, error = %err, "Non-retryable error");
                return Err(err);
            }
            Err(err) if attempt >= policy.max_retries => {
                tracing::error!(attempts = attempt + 1, error = %err, "Retries exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = backoff_delay(policy, attempt);
                tracing::info!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying after transient error"
                );
                metrics::record_provider_retry();
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            per_attempt_timeout_ms: 30_000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_runs_n_plus_one_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<(), ProviderError> = execute_with_retry(
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Overloaded("model is overloaded".into()))
                }
            },
            &policy(3),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // The last error comes back as-is.
        assert_eq!(result, Err(ProviderError::Overloaded("model is overloaded".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let start = Instant::now();

        let result: Result<(), ProviderError> = execute_with_retry(
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::ContentPolicy("prompt rejected".into()))
                }
            },
            &policy(5),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ProviderError::ContentPolicy(_))));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<(), ProviderError> = execute_with_retry(
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::ServiceUnavailable("503".into()))
                }
            },
            &policy(0),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures_with_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let start = Instant::now();

        let result: Result<&str, ProviderError> = execute_with_retry(
            || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProviderError::ServiceUnavailable("503 Service Unavailable".into()))
                    } else {
                        Ok("image")
                    }
                }
            },
            &policy(3),
        )
        .await;

        assert_eq!(result, Ok("image"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms after the first failure, 2000ms after the second.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3_000));
        assert!(elapsed < Duration::from_millis(3_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let short = RetryPolicy {
            per_attempt_timeout_ms: 100,
            ..policy(1)
        };

        let result: Result<(), ProviderError> = execute_with_retry(
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            },
            &short,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }
}
