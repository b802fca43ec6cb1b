//! Message votes.
//!
//! Endpoints:
//! - GET   /api/vote?chatId=  - votes in a chat
//! - PATCH /api/vote          - vote a message up or down

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use uuid::Uuid;

use parley_types::chat::{Vote, VoteType};

use crate::http::error::AppError;
use crate::http::extractors::session::CurrentUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteQuery {
    pub chat_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    #[serde(rename = "type")]
    pub vote_type: VoteType,
}

/// GET /api/vote?chatId=
pub async fn get_votes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<VoteQuery>,
) -> Result<ApiResponse<Vec<Vote>>, AppError> {
    let start = Instant::now();
    let votes = state
        .chat_service
        .get_votes_by_chat_id(&query.chat_id, &user.id)
        .await?;
    Ok(ApiResponse::success(votes, start))
}

/// PATCH /api/vote
pub async fn vote_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<VoteBody>,
) -> Result<ApiResponse<Vote>, AppError> {
    let start = Instant::now();
    let vote = state
        .chat_service
        .vote_message(&body.chat_id, &body.message_id, &user.id, body.vote_type)
        .await?;
    Ok(ApiResponse::success(vote, start))
}
