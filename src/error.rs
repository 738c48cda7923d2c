//! Error type shared by the relay pipeline and its HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::validator::ErrorDetail;

/// Longest slice of model output echoed back to the caller.
pub const RAW_ECHO_LIMIT: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Config(String),

    #[error("prompt is required in JSON body")]
    MissingPrompt,

    #[error("Gemini did not return valid JSON")]
    InvalidModelOutput { raw: String },

    #[error("Validation failed")]
    Validation { details: Vec<ErrorDetail> },

    #[error("{service} error (status {status}): {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingPrompt
            | RelayError::InvalidModelOutput { .. }
            | RelayError::Validation { .. } => StatusCode::BAD_REQUEST,
            RelayError::Config(_) | RelayError::Upstream { .. } | RelayError::Http(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            RelayError::InvalidModelOutput { raw } => json!({
                "error": self.to_string(),
                "raw": truncate(raw, RAW_ECHO_LIMIT),
            }),
            RelayError::Validation { details } => json!({
                "error": self.to_string(),
                "details": details,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 2), "he");
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RelayError::MissingPrompt.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::Validation { details: vec![] }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::Config("missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let upstream = RelayError::Upstream {
            service: "n8n API",
            status: 401,
            message: "{\"message\":\"unauthorized\"}".into(),
        };
        assert_eq!(upstream.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            upstream.to_string(),
            "n8n API error (status 401): {\"message\":\"unauthorized\"}"
        );
    }
}
