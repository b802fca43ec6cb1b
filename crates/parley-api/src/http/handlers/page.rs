//! Chat page bootstrap.
//!
//! Endpoints:
//! - GET /           - a fresh, empty chat
//! - GET /chat/{id}  - an existing chat with its messages
//!
//! Without a session both redirect to guest sign-in and come back.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Serialize;
use uuid::Uuid;

use parley_core::shell::ShellOptions;
use parley_types::chat::{Visibility, Vote};
use parley_types::error::ChatError;
use parley_types::turn::UiMessage;
use parley_types::user::User;

use crate::http::error::AppError;
use crate::http::extractors::session::{CHAT_MODEL_COOKIE, MaybeUser, cookie_value};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Everything the client needs to open a chat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBootstrap {
    #[serde(flatten)]
    pub options: ShellOptions,
    pub initial_messages: Vec<UiMessage>,
    pub votes: Vec<Vote>,
}

fn guest_redirect(return_to: &str) -> Response {
    Redirect::to(&format!("/api/auth/guest?redirectUrl={return_to}")).into_response()
}

fn selected_chat_model(state: &AppState, headers: &HeaderMap) -> String {
    cookie_value(headers, CHAT_MODEL_COOKIE)
        .map(str::to_string)
        .unwrap_or_else(|| state.config.default_chat_model.clone())
}

/// GET / - bootstrap a new chat.
pub async fn new_chat(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let Some(user) = user else {
        return guest_redirect("/");
    };

    let bootstrap = ChatBootstrap {
        options: ShellOptions {
            chat_id: Uuid::now_v7(),
            selected_chat_model: selected_chat_model(&state, &headers),
            visibility: Visibility::Private,
            is_readonly: false,
            user_type: user.user_type(),
        },
        initial_messages: Vec::new(),
        votes: Vec::new(),
    };
    ApiResponse::success(bootstrap, start).into_response()
}

/// GET /chat/{id} - bootstrap an existing chat.
///
/// Someone else's public chat opens read-only; someone else's private chat
/// is reported as not found.
pub async fn existing_chat(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let Some(user) = user else {
        return Ok(guest_redirect(&format!("/chat/{id}")));
    };

    let bootstrap = load_chat(&state, &user, id, selected_chat_model(&state, &headers)).await?;
    Ok(ApiResponse::success(bootstrap, start).into_response())
}

async fn load_chat(
    state: &AppState,
    user: &User,
    id: Uuid,
    selected_chat_model: String,
) -> Result<ChatBootstrap, AppError> {
    let (chat, access) = state
        .chat_service
        .get_chat_for_viewer(&id, Some(&user.id))
        .await
        .map_err(|e| match e {
            ChatError::Forbidden => ChatError::NotFound("chat"),
            other => other,
        })?;

    let messages = state.chat_service.get_messages_by_chat_id(&chat.id).await?;
    let votes = if access.is_readonly() {
        Vec::new()
    } else {
        state
            .chat_service
            .get_votes_by_chat_id(&chat.id, &user.id)
            .await?
    };

    Ok(ChatBootstrap {
        options: ShellOptions {
            chat_id: chat.id,
            selected_chat_model,
            visibility: chat.visibility,
            is_readonly: access.is_readonly(),
            user_type: user.user_type(),
        },
        initial_messages: messages.iter().map(UiMessage::from).collect(),
        votes,
    })
}
