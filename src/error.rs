/// Unified error types for the catalog service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (missing/invalid credential, failed login)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Request validation errors; `details` carries per-field messages
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Completion API errors
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// A store operation exceeded its time budget
    #[error("Store operation timed out")]
    Timeout,

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation {
            message: "validation failed".to_string(),
            details: serde_json::to_value(&errors).ok(),
        }
    }
}

/// Convert ApiError to an HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    details,
                },
            ),
            ApiError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: self.to_string(),
                    details: None,
                },
            ),
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: self.to_string(),
                    details: None,
                },
            ),
            ApiError::Conflict(_) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error: self.to_string(),
                    details: None,
                },
            ),
            ApiError::Database(_)
            | ApiError::Classifier(_)
            | ApiError::Timeout
            | ApiError::Internal(_) => {
                // Log the cause, don't leak it
                tracing::error!("request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal server error".to_string(),
                        details: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;
