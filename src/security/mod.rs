//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming generation request:
//!     → user id resolved by the handler
//!     → rate_limit.rs (per-user fixed window, per route)
//!     → provider call
//! ```
//!
//! # Design Decisions
//! - Rejections happen before any provider call
//! - Limits are in-memory and per instance; N instances allow N times the quota

pub mod rate_limit;

pub use rate_limit::{FixedWindowRateLimiter, RateLimitDecision};
