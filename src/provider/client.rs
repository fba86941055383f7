//! HTTP generation provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use crate::config::{ProviderConfig, TimeoutConfig};
use crate::provider::{
    is_valid_model, GenerationOutput, GenerationProvider, GenerationRequest, ProviderError,
};

/// Success-status body. Some providers answer 2xx with an error message
/// instead of outputs.
#[derive(Debug, Deserialize)]
struct ProviderReply {
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    Object { message: String },
}

impl ErrorDetail {
    fn message(&self) -> &str {
        match self {
            ErrorDetail::Message(message) | ErrorDetail::Object { message } => message,
        }
    }
}

/// Provider reached over HTTP: `POST {base_url}generate/{model}` with a JSON body.
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpProvider {
    pub fn new(provider: &ProviderConfig, timeouts: &TimeoutConfig) -> Result<Self, ProviderError> {
        let mut base = provider.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid provider base_url: {}", e)))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &provider.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| ProviderError::InvalidRequest(format!("invalid api key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .user_agent(concat!("vary-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, model: &str) -> Result<Url, ProviderError> {
        if !is_valid_model(model) {
            return Err(ProviderError::InvalidRequest(format!("invalid model '{}'", model)));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("provider base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .push("generate")
            .push(model);
        Ok(url)
    }
}

#[async_trait]
impl GenerationProvider for HttpProvider {
    fn name(&self) -> &str {
        self.base_url.as_str()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        let url = self.endpoint(&request.model)?;
        tracing::debug!(url = %url, model = %request.model, "Calling provider");

        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ProviderError::from_status(status.as_u16(), &body);
            tracing::warn!(status = %status, error = %err, "Provider returned error");
            return Err(err);
        }

        let reply: ProviderReply = response.json().await?;
        if let Some(detail) = reply.error {
            let err = ProviderError::classify_message(detail.message());
            tracing::warn!(status = %status, error = %err, "Provider reported error in body");
            return Err(err);
        }
        if reply.outputs.is_empty() {
            return Err(ProviderError::Other("provider returned no outputs".to_string()));
        }
        Ok(GenerationOutput {
            outputs: reply.outputs,
        })
    }
}
