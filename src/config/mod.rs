//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → resolved per route when AppState is built
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Routes inherit root retry/breaker/rate-limit settings unless overridden

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, parse_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, ProviderConfig,
    RateLimitConfig, RetryPolicy, RouteConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
