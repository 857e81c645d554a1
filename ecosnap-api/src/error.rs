//! Error types for ecosnap-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::classifier::ClassifierError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - duplicate username, submission id reused by another user
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Detection service failed; nothing was persisted (503)
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(#[from] ClassifierError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// ecosnap-common error that has no client-facing meaning
    #[error("Common error: {0}")]
    Common(ecosnap_common::Error),
}

impl From<ecosnap_common::Error> for ApiError {
    fn from(err: ecosnap_common::Error) -> Self {
        use ecosnap_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Common(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::ClassifierUnavailable(ref err) => {
                let body = Json(json!({
                    "error": {
                        "code": "CLASSIFIER_UNAVAILABLE",
                        "message": err.to_string(),
                        "retryable": true,
                    }
                }));
                return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
