//! Chat turn and chat management endpoints.
//!
//! Endpoints:
//! - POST   /api/chat                          - run a turn, streamed as SSE
//! - POST   /api/chat/{id}/stop                - stop the running turn
//! - DELETE /api/chat?id=                      - delete a chat
//! - PATCH  /api/chat/{id}/visibility          - make a chat public or private
//! - DELETE /api/chat/{id}/messages?after=     - drop messages after a point
//!
//! The turn stream relays chunks in the same shape the turn endpoint sends
//! them, one JSON object per `data:` line, ending with `data: [DONE]`:
//!
//! ```text
//! event: chat
//! data: {"id":"..."}
//!
//! data: {"type":"text-delta","textDelta":"Hel"}
//! data: {"type":"finish","finishReason":"stop"}
//! data: [DONE]
//! ```
//!
//! A failed turn sends `{"type":"error","errorText":"..."}` before `[DONE]`.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use uuid::Uuid;

use parley_core::turn::task::TurnOutcome;
use parley_types::chat::{Chat, Visibility};
use parley_types::error::ChatError;
use parley_types::turn::TurnRequest;

use crate::http::error::AppError;
use crate::http::extractors::session::CurrentUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;
use crate::turn_runner::{DetachedTurn, start_turn};

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    #[serde(flatten)]
    pub turn: TurnRequest,
    /// Visibility of the chat if this turn creates it.
    #[serde(default, rename = "selectedVisibilityType")]
    pub visibility: Visibility,
}

/// POST /api/chat - run one turn and stream it back.
pub async fn stream_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ChatRequestBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let started = start_turn(&state, &user, body.turn, body.visibility).await?;
    let DetachedTurn {
        chat_id,
        mut chunks,
        outcome,
    } = started.detach(state)?;

    let sse_stream = async_stream::stream! {
        let chat_json = serde_json::json!({ "id": chat_id });
        yield Ok::<_, Infallible>(Event::default().event("chat").data(chat_json.to_string()));

        while let Some(chunk) = chunks.recv().await {
            match serde_json::to_string(&chunk) {
                Ok(data) => yield Ok(Event::default().data(data)),
                Err(e) => tracing::warn!(error = %e, "failed to encode turn chunk"),
            }
        }

        let error_text = match outcome.await {
            Ok(Ok(TurnOutcome::Cancelled { .. })) => {
                yield Ok(Event::default().event("stopped").data("{}"));
                None
            }
            Ok(Ok(TurnOutcome::Completed { .. })) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("turn ended unexpectedly".to_string()),
        };
        if let Some(error_text) = error_text {
            let data = serde_json::json!({ "type": "error", "errorText": error_text });
            yield Ok(Event::default().data(data.to_string()));
        }

        yield Ok(Event::default().data("[DONE]"));
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// POST /api/chat/{id}/stop - cancel the chat's running turn.
pub async fn stop_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<StopResponse>, AppError> {
    let start = Instant::now();
    let (_, access) = state
        .chat_service
        .get_chat_for_viewer(&id, Some(&user.id))
        .await?;
    if access.is_readonly() {
        return Err(ChatError::Forbidden.into());
    }

    let stopped = state.turns.cancel(&id);
    tracing::debug!(chat_id = %id, stopped, "stop requested");
    Ok(ApiResponse::success(StopResponse { stopped }, start))
}

#[derive(Debug, Deserialize)]
pub struct ChatIdQuery {
    pub id: Uuid,
}

/// DELETE /api/chat?id= - delete a chat with its messages and votes.
pub async fn delete_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ChatIdQuery>,
) -> Result<ApiResponse<Chat>, AppError> {
    let start = Instant::now();
    let chat = state.chat_service.delete_chat(&query.id, &user.id).await?;
    state.turns.cancel(&chat.id);
    Ok(ApiResponse::success(chat, start))
}

#[derive(Debug, Deserialize)]
pub struct VisibilityBody {
    pub visibility: Visibility,
}

/// PATCH /api/chat/{id}/visibility
pub async fn update_visibility(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<VisibilityBody>,
) -> Result<ApiResponse<Chat>, AppError> {
    let start = Instant::now();
    let chat = state
        .chat_service
        .update_visibility(&id, &user.id, body.visibility)
        .await?;
    Ok(ApiResponse::success(chat, start))
}

/// Either a point in time or the message to keep as the last one.
#[derive(Debug, Deserialize)]
pub struct TrailingQuery {
    pub after: Option<DateTime<Utc>>,
    #[serde(rename = "messageId")]
    pub message_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

/// DELETE /api/chat/{id}/messages?after=<rfc3339> | ?messageId=<id>
pub async fn delete_trailing_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<TrailingQuery>,
) -> Result<ApiResponse<DeletedResponse>, AppError> {
    let start = Instant::now();
    let deleted = match (query.after, query.message_id) {
        (Some(after), None) => {
            state
                .chat_service
                .delete_messages_after(&id, &user.id, after)
                .await?
        }
        (None, Some(message_id)) => {
            let message = state
                .chat_service
                .get_message_by_id(&message_id)
                .await?
                .filter(|m| m.chat_id == id)
                .ok_or(ChatError::NotFound("message"))?;
            state
                .chat_service
                .delete_trailing_messages(&message.id, &user.id)
                .await?
        }
        _ => {
            return Err(AppError::Validation(
                "provide exactly one of 'after' or 'messageId'".to_string(),
            ));
        }
    };
    Ok(ApiResponse::success(
        DeletedResponse {
            deleted: deleted.len(),
        },
        start,
    ))
}
