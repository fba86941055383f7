//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (parse body, resolve user id, validate)
//!     → handlers.rs (rate limit → circuit breaker → retried provider call)
//!     → response.rs / error.rs (JSON body + status)
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use error::ApiError;
pub use request::{VaryRequest, X_REQUEST_ID, X_USER_ID};
pub use server::{build_router, AppState, HttpServer, RouteState};
