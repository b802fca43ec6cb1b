//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use parley_types::error::{AuthError, ChatError, RepositoryError, TurnError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    /// No session, or the session expired.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Chat(ChatError::Store(e))
    }
}

impl AppError {
    /// Status code plus machine-readable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Chat(ChatError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Chat(ChatError::CursorNotFound(_)) => {
                (StatusCode::NOT_FOUND, "CURSOR_NOT_FOUND")
            }
            AppError::Chat(ChatError::InvalidPage(_)) => (StatusCode::BAD_REQUEST, "INVALID_PAGE"),
            AppError::Chat(ChatError::Forbidden) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Chat(ChatError::RateLimited { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
            }
            AppError::Chat(ChatError::Validation(_)) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Chat(ChatError::Store(_)) | AppError::Auth(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR")
            }
            AppError::Turn(TurnError::Busy) => (StatusCode::CONFLICT, "TURN_IN_PROGRESS"),
            AppError::Turn(_) => (StatusCode::BAD_GATEWAY, "TURN_FAILED"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": self.to_string(),
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
