//! Generation provider abstraction.
//!
//! # Data Flow
//! ```text
//! handler
//!     → GenerationProvider::generate (trait object in AppState)
//!     → client.rs (HTTP provider, status → ProviderError tag)
//! ```
//!
//! # Design Decisions
//! - Providers report failures as tagged `ProviderError`s
//! - Free-text classification only happens inside adapters

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::HttpProvider;
pub use error::ProviderError;
pub use types::{is_valid_model, GenerationOutput, GenerationRequest};

/// An upstream image/video generation service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, ProviderError>;
}
