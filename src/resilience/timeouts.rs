//! Per-attempt timeout enforcement.
//!
//! Every provider attempt races against a deadline. An attempt that loses the
//! race is dropped, which cancels the in-flight request, and surfaces as the
//! caller's own timeout error so the retry classifier can treat it as
//! transient.

use std::future::Future;
use std::time::Duration;

use crate::resilience::retries::TransientError;

/// Run `future`, failing with `E::timed_out` if it does not settle within `limit`.
pub async fn with_timeout<T, E, F>(limit: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: TransientError,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(E::timed_out(limit)),
    }
}

/// Whole seconds for a `Retry-After` hint: rounded up, never zero.
pub fn ceil_secs(duration: Duration) -> u64 {
    (duration.as_millis().div_ceil(1000) as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::ZERO), 1);
        assert_eq!(ceil_secs(Duration::from_millis(1_001)), 2);
        assert_eq!(ceil_secs(Duration::from_secs(30)), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_future_times_out() {
        let result: Result<(), ProviderError> = with_timeout(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_future_passes_through() {
        let result: Result<u32, ProviderError> =
            with_timeout(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));

        let result: Result<u32, ProviderError> = with_timeout(Duration::from_secs(1), async {
            Err(ProviderError::ContentPolicy("blocked".into()))
        })
        .await;
        assert_eq!(result, Err(ProviderError::ContentPolicy("blocked".into())));
    }
}
