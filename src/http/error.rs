//! HTTP error mapping.
//!
//! Every failure leaves the handler as JSON `{ success: false, error, retryable, retryAfter? }`
//! with a status picked from the error's tag.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::http::response::ErrorBody;
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unknown route '{0}'")]
    UnknownRoute(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Missing user id")]
    MissingUser,

    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Service temporarily unavailable for '{route}'. Try again in {retry_after_secs} seconds.")]
    CircuitOpen { route: String, retry_after_secs: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingUser => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Provider(err) => match err {
                ProviderError::RateLimited(_) | ProviderError::QuotaExceeded(_) => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                ProviderError::ServiceUnavailable(_) | ProviderError::Overloaded(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ProviderError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
                ProviderError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ProviderError::ContentPolicy(_) | ProviderError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                ProviderError::BadGateway(_) => StatusCode::BAD_GATEWAY,
                ProviderError::InternalServerError(_)
                | ProviderError::Network(_)
                | ProviderError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Whether the client may usefully try again later.
    pub fn retryable(&self) -> bool {
        match self {
            ApiError::RateLimited { .. } | ApiError::CircuitOpen { .. } => true,
            ApiError::Provider(err) => err.is_retryable(),
            _ => false,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ApiError::RateLimited { retry_after_secs }
            | ApiError::CircuitOpen { retry_after_secs, .. } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = self.retry_after_secs();
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            retryable: self.retryable(),
            retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Provider(ProviderError::QuotaExceeded("q".into())), 429, true),
            (ApiError::Provider(ProviderError::Overloaded("o".into())), 503, true),
            (ApiError::Provider(ProviderError::Timeout("t".into())), 408, true),
            (ApiError::Provider(ProviderError::Unauthorized("u".into())), 401, false),
            (ApiError::Provider(ProviderError::ContentPolicy("c".into())), 400, false),
            (ApiError::Provider(ProviderError::Other("x".into())), 500, false),
            (ApiError::RateLimited { retry_after_secs: 3 }, 429, true),
            (
                ApiError::CircuitOpen { route: "r".into(), retry_after_secs: 30 },
                503,
                true,
            ),
            (ApiError::MissingUser, 401, false),
            (ApiError::Validation("v".into()), 400, false),
        ];

        for (err, status, retryable) in cases {
            assert_eq!(err.status().as_u16(), status, "{err}");
            assert_eq!(err.retryable(), retryable, "{err}");
        }
    }

    #[test]
    fn test_retry_after_header() {
        let response = ApiError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");

        let response = ApiError::MissingUser.into_response();
        assert!(response.headers().get(RETRY_AFTER).is_none());
    }
}
