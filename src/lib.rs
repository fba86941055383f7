//! Resilient gateway for generative-AI provider calls.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /api/{route}
//!        │
//!        ▼
//!   ┌──────────┐   ┌───────────────┐   ┌─────────────────┐   ┌────────────────┐
//!   │   http   │──▶│   security    │──▶│   resilience    │──▶│    provider    │──▶ model API
//!   │ handlers │   │ rate_limit    │   │ circuit breaker │   │ HttpProvider   │
//!   └──────────┘   │ (per user)    │   │ → retry/backoff │   │ (ProviderError │
//!        ▲         └───────────────┘   │ → timeout       │   │  tags)         │
//!        │                             └─────────────────┘   └────────────────┘
//!   JSON { success, error?, retryable?, ... }
//!
//!   Cross-cutting: config (TOML + validation), observability (tracing, metrics),
//!   lifecycle (graceful shutdown)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
