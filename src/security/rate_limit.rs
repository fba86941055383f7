//! Fixed-window, per-user rate limiting.
//!
//! Each user gets a counter that resets when its window ends. Expiry is
//! evaluated lazily at the next access: expired entries are swept at the start
//! of every check, never by a background timer.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::resilience::ceil_secs;

struct RateLimitEntry {
    count: u32,
    window_reset_at: Instant,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the user's window resets.
    pub reset_after: Duration,
    /// Whole seconds to wait, set only on rejection.
    pub retry_after_secs: Option<u64>,
}

/// Per-user fixed-window request counter.
pub struct FixedWindowRateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    config: RateLimitConfig,
}

impl FixedWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a request for `user_id` and decide whether it may proceed.
    pub fn check(&self, user_id: &str) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision {
                allowed: true,
                remaining: self.config.max_requests,
                reset_after: Duration::ZERO,
                retry_after_secs: None,
            };
        }

        let now = Instant::now();
        let window = self.config.window();
        let max = self.config.max_requests;

        let mut entries = self.lock();
        entries.retain(|_, entry| entry.window_reset_at >= now);

        match entries.get_mut(user_id) {
            Some(entry) if now < entry.window_reset_at => {
                let reset_after = entry.window_reset_at - now;
                if entry.count >= max {
                    let retry_after_secs = ceil_secs(reset_after);
                    tracing::warn!(user = %user_id, retry_after_secs, "Rate limit exceeded");
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_after,
                        retry_after_secs: Some(retry_after_secs),
                    };
                }
                entry.count += 1;
                RateLimitDecision {
                    allowed: true,
                    remaining: max - entry.count,
                    reset_after,
                    retry_after_secs: None,
                }
            }
            _ => {
                entries.insert(
                    user_id.to_string(),
                    RateLimitEntry {
                        count: 1,
                        window_reset_at: now + window,
                    },
                );
                RateLimitDecision {
                    allowed: true,
                    remaining: max.saturating_sub(1),
                    reset_after: window,
                    retry_after_secs: None,
                }
            }
        }
    }

    /// Users with an unexpired window.
    pub fn active_users(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|entry| entry.window_reset_at > now)
            .count()
    }
}
