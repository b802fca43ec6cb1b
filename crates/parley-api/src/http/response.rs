//! Envelope response format for JSON API responses.
//!
//! Every JSON response is wrapped in a consistent envelope:
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 }
//! }
//! ```
//! Errors use the same envelope with `data: null` and an `errors` list (see
//! [`crate::http::error::AppError`]).

use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Envelope response wrapping API data.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ApiMeta,
}

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unique request identifier for tracing.
    pub request_id: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
    pub response_time_ms: u64,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap `data`, timing the request from `start`.
    pub fn success(data: T, start: Instant) -> Self {
        Self {
            data,
            meta: ApiMeta {
                request_id: uuid::Uuid::now_v7().to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                response_time_ms: start.elapsed().as_millis() as u64,
            },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = serde_json::to_string(&self).unwrap_or_else(|_| {
            r#"{"errors":[{"code":"SERIALIZATION_ERROR","message":"Failed to serialize response"}]}"#.to_string()
        });

        (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
