//! Deterministic exponential backoff.

use std::time::Duration;

use crate::config::RetryPolicy;

/// Delay to wait after failed attempt `attempt` (0-based).
///
/// `min(base_delay_ms * backoff_multiplier^attempt, max_delay_ms)`, no jitter.
/// Large exponents saturate at the cap instead of overflowing.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let raw_ms = policy.base_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let capped_ms = raw_ms.min(policy.max_delay_ms as f64);

    Duration::from_millis(capped_ms as u64)
}

/// Longest a fully retried call can take: every attempt hitting its deadline
/// plus every backoff sleep in between.
pub fn retry_budget(policy: &RetryPolicy) -> Duration {
    let attempts = policy.max_retries.saturating_add(1);
    let sleeping = (0..policy.max_retries)
        .map(|attempt| backoff_delay(policy, attempt))
        .fold(Duration::ZERO, Duration::saturating_add);

    policy
        .per_attempt_timeout()
        .saturating_mul(attempts)
        .saturating_add(sleeping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 10,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            per_attempt_timeout_ms: 30_000,
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let p = policy();
        let delays: Vec<u128> = (0..6).map(|i| backoff_delay(&p, i).as_millis()).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);
    }

    #[test]
    fn test_backoff_is_monotonic_until_cap() {
        let p = RetryPolicy {
            base_delay_ms: 250,
            backoff_multiplier: 1.5,
            max_delay_ms: 5_000,
            ..policy()
        };

        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = backoff_delay(&p, attempt);
            assert!(delay >= previous, "attempt {attempt} decreased");
            assert!(delay <= Duration::from_millis(5_000));
            previous = delay;
        }
        assert_eq!(previous, Duration::from_millis(5_000));
    }

    #[test]
    fn test_retry_budget() {
        let p = RetryPolicy {
            max_retries: 3,
            ..policy()
        };
        // 4 attempts * 30s + 1s + 2s + 4s
        assert_eq!(retry_budget(&p), Duration::from_secs(127));

        let single = RetryPolicy {
            max_retries: 0,
            ..policy()
        };
        assert_eq!(retry_budget(&single), Duration::from_secs(30));
    }

    #[test]
    fn test_huge_attempt_saturates() {
        assert_eq!(
            backoff_delay(&policy(), u32::MAX),
            Duration::from_millis(10_000)
        );
    }
}
