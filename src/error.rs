//! Error types surfaced at the HTTP boundary and during startup.

use crate::application::limiter::BuildError;
use crate::domain::client::ClientIdError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Errors produced by the rate limiting middleware and its configuration.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("client could not be identified: {0}")]
    UnidentifiableClient(#[from] ClientIdError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to build rate limiter: {0}")]
    Build(#[from] BuildError),
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        match self {
            RateLimitError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(ErrorResponse {
                    error: "Too Many Requests".to_string(),
                    message: format!(
                        "Rate limit exceeded. Try again in {} seconds.",
                        retry_after_secs
                    ),
                }),
            )
                .into_response(),
            RateLimitError::UnidentifiableClient(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse {
                    error: "Unidentifiable Client".to_string(),
                    message: "The request source could not be identified".to_string(),
                }),
            )
                .into_response(),
            RateLimitError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Configuration Error".to_string(),
                    message: msg,
                }),
            )
                .into_response(),
            RateLimitError::Build(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Configuration Error".to_string(),
                    message: e.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::PolicyError;

    #[test]
    fn test_rate_limited_response() {
        let response = RateLimitError::RateLimited { retry_after_secs: 55 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "55"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_unidentifiable_client_response() {
        let response =
            RateLimitError::UnidentifiableClient(ClientIdError::NoPeerAddress).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_configuration_errors_are_server_errors() {
        let response = RateLimitError::Config("bad header".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response =
            RateLimitError::Build(BuildError::Policy(PolicyError::ZeroLimit)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            RateLimitError::RateLimited { retry_after_secs: 3 }.to_string(),
            "rate limit exceeded, retry after 3s"
        );
        assert_eq!(
            RateLimitError::from(BuildError::ZeroMaxClients).to_string(),
            "failed to build rate limiter: max clients must be greater than 0"
        );
    }
}
