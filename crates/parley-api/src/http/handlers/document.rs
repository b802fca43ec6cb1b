//! Artifact documents.
//!
//! Endpoints:
//! - GET    /api/document?id=             - every version, oldest first
//! - POST   /api/document?id=             - save a new version
//! - DELETE /api/document?id=&timestamp=  - drop versions after `timestamp`

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use parley_types::document::{ArtifactKind, Document};

use crate::http::error::AppError;
use crate::http::extractors::session::CurrentUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDocumentQuery {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaveDocumentBody {
    pub title: String,
    #[serde(default)]
    pub kind: ArtifactKind,
    pub content: Option<String>,
}

/// GET /api/document?id=
pub async fn get_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DocumentQuery>,
) -> Result<ApiResponse<Vec<Document>>, AppError> {
    let start = Instant::now();
    let documents = state
        .document_service
        .get_documents_by_id(&query.id, &user.id)
        .await?;
    Ok(ApiResponse::success(documents, start))
}

/// POST /api/document?id=
pub async fn save_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DocumentQuery>,
    Json(body): Json<SaveDocumentBody>,
) -> Result<ApiResponse<Document>, AppError> {
    let start = Instant::now();
    let document = state
        .document_service
        .save_document(query.id, user.id, body.title, body.kind, body.content)
        .await?;
    Ok(ApiResponse::success(document, start))
}

/// DELETE /api/document?id=&timestamp=
pub async fn delete_document_versions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DeleteDocumentQuery>,
) -> Result<ApiResponse<Vec<Document>>, AppError> {
    let start = Instant::now();
    let deleted = state
        .document_service
        .delete_documents_after(&query.id, &user.id, query.timestamp)
        .await?;
    Ok(ApiResponse::success(deleted, start))
}
