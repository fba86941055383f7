//! Provider request/response types.

use serde::{Deserialize, Serialize};

/// A generation call sent to a provider model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub num_outputs: u32,
}

/// Generated assets returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    /// URLs (or data URIs) of the generated images/videos.
    pub outputs: Vec<String>,
}

/// Model names travel as a single URL path segment: ASCII letters, digits,
/// `.`, `_` and `-`, and never `.` or `..` on their own.
pub fn is_valid_model(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
