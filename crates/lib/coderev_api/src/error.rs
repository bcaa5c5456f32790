//! Application error types.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coderev_core::auth::{SessionError, TokenError};
use coderev_core::review::{AnalysisError, ReviewError};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream failure: {0}")]
    BadGateway(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::PayloadTooLarge(m) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", m.as_str())
            }
            AppError::BadGateway(m) => (StatusCode::BAD_GATEWAY, "review_failed", m.as_str()),
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::Validation(rejection.body_text())
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Validation(msg) => AppError::Validation(msg),
            SessionError::AlreadyExists => AppError::Conflict(e.to_string()),
            SessionError::InvalidCredentials
            | SessionError::InvalidToken
            | SessionError::Unauthorized => {
                warn!(reason = %e, "authentication failed");
                AppError::Unauthorized(e.to_string())
            }
            SessionError::Storage(err) => AppError::Internal(err.to_string()),
            SessionError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ReviewError> for AppError {
    fn from(e: ReviewError) -> Self {
        match e {
            ReviewError::Validation(msg) => AppError::Validation(msg),
            ReviewError::NotFound => AppError::NotFound(e.to_string()),
            ReviewError::Pipeline { review_id, source } => {
                let message = match source {
                    AnalysisError::Timeout(_) => format!("Code review {review_id} timed out"),
                    _ => format!("Code review {review_id} failed"),
                };
                AppError::BadGateway(message)
            }
            ReviewError::AlreadyFinalized(_) => AppError::Conflict(e.to_string()),
            ReviewError::Storage(err) => AppError::Internal(err.to_string()),
            ReviewError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Failures while wiring services at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("token issuer: {0}")]
    Token(#[from] TokenError),

    #[error("analyzer: {0}")]
    Analyzer(#[from] AnalysisError),
}
