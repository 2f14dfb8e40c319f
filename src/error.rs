//! Error types for the Marginalia server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::annotations::IdentityError;
use crate::html::SanitizeError;
use crate::storage::StoreError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Annotation limit reached: {0}")]
    LimitReached(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sanitize error: {0}")]
    Sanitize(#[from] SanitizeError),

    #[error("{0}")]
    Identity(#[from] IdentityError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::LimitReached(msg) => {
                (StatusCode::FORBIDDEN, "limit_reached", msg.clone())
            }
            AppError::Identity(e) => (StatusCode::BAD_REQUEST, "bad_request", e.to_string()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                match e {
                    StoreError::Serialization(_) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "invalid_record",
                        "Stored record could not be decoded".to_string(),
                    ),
                    StoreError::Transport(_) => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "store_unavailable",
                        "Store unavailable".to_string(),
                    ),
                    StoreError::Database(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "database_error",
                        "Database error".to_string(),
                    ),
                }
            }
            AppError::Sanitize(e) => {
                tracing::error!("Sanitize error: {}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "sanitize_error",
                    "Failed to sanitize HTML".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::LimitReached("x".into()), StatusCode::FORBIDDEN),
            (
                AppError::Store(StoreError::Transport("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Identity(IdentityError::Invalid("zz".into())),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
