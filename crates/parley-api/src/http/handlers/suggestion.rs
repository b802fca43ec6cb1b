//! Document suggestions.
//!
//! Endpoints:
//! - GET  /api/suggestions?documentId=  - suggestions on a document, newest first
//! - POST /api/suggestions              - propose edits to the latest version

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use uuid::Uuid;

use parley_core::document::service::NewSuggestion;
use parley_types::document::Suggestion;

use crate::http::error::AppError;
use crate::http::extractors::session::CurrentUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    pub document_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionInput {
    pub original_text: String,
    pub suggested_text: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSuggestionsBody {
    pub document_id: Uuid,
    pub suggestions: Vec<SuggestionInput>,
}

/// GET /api/suggestions?documentId=
pub async fn get_suggestions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SuggestionQuery>,
) -> Result<ApiResponse<Vec<Suggestion>>, AppError> {
    let start = Instant::now();
    let suggestions = state
        .document_service
        .get_suggestions_by_document_id(&query.document_id, &user.id)
        .await?;
    Ok(ApiResponse::success(suggestions, start))
}

/// POST /api/suggestions
pub async fn save_suggestions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SaveSuggestionsBody>,
) -> Result<ApiResponse<Vec<Suggestion>>, AppError> {
    let start = Instant::now();
    let inputs = body
        .suggestions
        .into_iter()
        .map(|s| NewSuggestion {
            original_text: s.original_text,
            suggested_text: s.suggested_text,
            description: s.description,
        })
        .collect();
    let saved = state
        .document_service
        .save_suggestions(&body.document_id, &user.id, inputs)
        .await?;
    Ok(ApiResponse::success(saved, start))
}
