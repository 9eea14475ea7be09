//! Error types for the proxy, and the JSON envelope every error is rendered as.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required query parameters")]
    MissingParameters,

    /// The upstream answered with its own `status`/`message` pair.
    #[error("Upstream error {status}: {message}")]
    Upstream { status: String, message: String },

    #[error("Upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("Upstream did not return a ZIP payload")]
    UnexpectedPayload,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn upstream(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status: status.into(),
            message: message.into(),
        }
    }

    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameters | Self::Upstream { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamStatus(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing envelope. Transport details stay in the logs.
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::Config { .. } => ErrorEnvelope::new(
                "500",
                "The DART API key is not configured on the server.",
            ),
            Self::MissingParameters => {
                ErrorEnvelope::new("400", "Required query parameters are missing.")
            }
            Self::Upstream { status, message } => ErrorEnvelope::new(status, message),
            Self::UpstreamStatus(code) => ErrorEnvelope::new(
                code.to_string(),
                "Failed to fetch the ZIP file from the DART API.",
            ),
            Self::UnexpectedPayload => ErrorEnvelope::new(
                "500",
                "The DART API did not return the expected ZIP payload (check the API key).",
            ),
            Self::Http(_) | Self::Json(_) | Self::Toml(_) => ErrorEnvelope::new(
                "500",
                "The server failed while requesting the DART API.",
            ),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.envelope())).into_response()
    }
}

/// `{ "status": "...", "message": "..." }`, the only error shape callers see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_business_error_is_bad_request() {
        let err = ProxyError::upstream("013", "No data");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.envelope(), ErrorEnvelope::new("013", "No data"));
    }

    #[test]
    fn test_upstream_status_is_forwarded() {
        let err = ProxyError::UpstreamStatus(503);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.envelope().status, "503");
    }

    #[test]
    fn test_bogus_upstream_status_falls_back_to_500() {
        assert_eq!(
            ProxyError::UpstreamStatus(42).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_config_and_payload_errors_are_500() {
        for err in [ProxyError::config("unset"), ProxyError::UnexpectedPayload] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.envelope().status, "500");
        }
    }

    #[test]
    fn test_config_message_is_not_leaked() {
        let err = ProxyError::config("Environment variable 'SECRET_NAME' not set");
        assert!(!err.envelope().message.contains("SECRET_NAME"));
    }

    #[test]
    fn test_missing_parameters_envelope() {
        let err = ProxyError::MissingParameters;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.envelope().status, "400");
        assert!(err.envelope().message.contains("missing"));
    }
}
