//! Inbound request parsing and validation.

use axum::http::HeaderMap;
use serde::Deserialize;
use url::Url;

use crate::http::error::ApiError;
use crate::provider::{is_valid_model, GenerationRequest};

/// Correlation header set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Fallback source for the caller's user id.
pub const X_USER_ID: &str = "x-user-id";

const MAX_PROMPT_CHARS: usize = 2_000;
const MAX_OUTPUTS: u32 = 4;

/// Body of `POST /api/{route}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaryRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Overrides the route's model when set.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub num_outputs: Option<u32>,
}

impl VaryRequest {
    /// The caller's user id; the body field wins over the header.
    pub fn user_id(&self, headers: &HeaderMap) -> Option<String> {
        self.user_id
            .as_deref()
            .or_else(|| headers.get(X_USER_ID).and_then(|v| v.to_str().ok()))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::Validation("prompt must not be empty".to_string()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(ApiError::Validation(format!(
                "prompt exceeds {} characters",
                MAX_PROMPT_CHARS
            )));
        }

        if let Some(n) = self.num_outputs {
            if n == 0 || n > MAX_OUTPUTS {
                return Err(ApiError::Validation(format!(
                    "numOutputs must be between 1 and {}",
                    MAX_OUTPUTS
                )));
            }
        }

        if let Some(raw) = &self.image_url {
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https" | "data") => {}
                _ => return Err(ApiError::Validation("imageUrl must be an http(s) or data URL".to_string())),
            }
        }

        if let Some(model) = &self.model {
            if !is_valid_model(model) {
                return Err(ApiError::Validation(
                    "model may only contain letters, digits, '.', '_' and '-'".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn into_generation(self, route_model: &str) -> GenerationRequest {
        GenerationRequest {
            model: self.model.unwrap_or_else(|| route_model.to_string()),
            prompt: self.prompt.trim().to_string(),
            image_url: self.image_url,
            num_outputs: self.num_outputs.unwrap_or(1),
        }
    }
}

/// Request id assigned by the request-id layer, if any.
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn request(prompt: &str) -> VaryRequest {
        VaryRequest {
            user_id: None,
            prompt: prompt.to_string(),
            image_url: None,
            model: None,
            num_outputs: None,
        }
    }

    #[test]
    fn test_user_id_prefers_body() {
        let mut headers = HeaderMap::new();
        headers.insert(X_USER_ID, HeaderValue::from_static("header-user"));

        let mut req = request("a knight");
        assert_eq!(req.user_id(&headers).as_deref(), Some("header-user"));

        req.user_id = Some("body-user".to_string());
        assert_eq!(req.user_id(&headers).as_deref(), Some("body-user"));

        req.user_id = Some("   ".to_string());
        assert_eq!(req.user_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_validation() {
        assert!(request("a knight in armor").validate().is_ok());
        assert!(request("   ").validate().is_err());
        assert!(request(&"x".repeat(2_001)).validate().is_err());

        let mut req = request("a knight");
        req.num_outputs = Some(5);
        assert!(req.validate().is_err());

        let mut req = request("a knight");
        req.image_url = Some("ftp://example.com/a.png".to_string());
        assert!(req.validate().is_err());
        req.image_url = Some("https://cdn.example.com/a.png".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_model_override_must_be_a_single_segment() {
        let mut req = request("a knight");
        req.model = Some("gen4_image".to_string());
        assert!(req.validate().is_ok());

        for bad in ["..", ".", "x?y=1", "x#y", "../admin", ""] {
            req.model = Some(bad.to_string());
            assert!(
                matches!(req.validate(), Err(ApiError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_into_generation_uses_route_model() {
        let generation = request("  a knight ").into_generation("gen4_image");
        assert_eq!(generation.model, "gen4_image");
        assert_eq!(generation.prompt, "a knight");
        assert_eq!(generation.num_outputs, 1);
    }
}
