//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Provider → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger → stop accepting → drain in-flight requests → exit
//! ```

pub mod shutdown;

pub use shutdown::{shutdown_signal, Shutdown};
