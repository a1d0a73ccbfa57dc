//! Error handling for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hark_core::error::HarkError;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
#[error("[{status}] {code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<HarkError> for ApiError {
    fn from(err: HarkError) -> Self {
        let code = err.code().as_str();
        let suggestion = err.suggestion().map(|s| serde_json::json!({ "suggestion": s }));

        let api = match &err {
            HarkError::Configuration(_)
            | HarkError::MissingField { .. }
            | HarkError::UnknownStep { .. }
            | HarkError::Lexicon { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, code, err.to_string())
            }
            HarkError::Serialization(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, code, err.to_string())
            }
            HarkError::Io(_) | HarkError::Internal(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
            }
        };

        match suggestion {
            Some(details) => api.with_details(details),
            None => api,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hark_error() {
        let api: ApiError = HarkError::unknown_step("greet").into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "CFG_003");
        assert!(api.details.is_some());

        let api: ApiError = HarkError::Internal("boom".into()).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.details.is_none());
    }

    #[test]
    fn test_display() {
        let err = ApiError::not_found("group g1 not found");
        assert_eq!(err.to_string(), "[404 Not Found] NOT_FOUND: group g1 not found");
    }
}
