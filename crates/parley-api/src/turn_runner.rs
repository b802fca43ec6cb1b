//! Server side of a chat turn, shared by the SSE endpoint and the CLI chat loop.
//!
//! Starting a turn checks the user's daily allowance, creates the chat on
//! its first message, claims the chat's turn slot, stores the user message
//! and spawns the [`TurnTask`]. Finishing it waits for the task and stores
//! whatever assistant text was produced, including the partial text of a
//! stopped turn. A detached turn finishes on its own task, so it holds its
//! slot and is stored even when nobody is reading it anymore.

use std::time::Duration;

use parley_core::chat::now;
use parley_core::turn::registry::TurnLease;
use parley_core::turn::task::{TurnHandle, TurnOutcome, TurnTask};
use parley_types::chat::{Chat, ChatMessage, MessagePart, MessageRole, Visibility};
use parley_types::turn::{TurnChunk, TurnRequest};
use parley_types::user::User;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use crate::http::error::AppError;
use crate::state::AppState;

/// Outputs of a turn that finishes in the background.
pub struct DetachedTurn {
    pub chat_id: Uuid,
    pub chunks: mpsc::UnboundedReceiver<TurnChunk>,
    /// Resolves once the reply is stored and the slot released.
    pub outcome: oneshot::Receiver<Result<TurnOutcome, AppError>>,
}

/// A running turn plus the slot it holds.
pub struct StartedTurn {
    pub chat: Chat,
    pub handle: TurnHandle,
    lease: TurnLease,
}

impl StartedTurn {
    pub fn chat_id(&self) -> Uuid {
        self.chat.id
    }

    /// Hand the rest of the turn to a background task that owns the slot.
    ///
    /// Dropping the returned receivers does not stop or lose the turn.
    pub fn detach(mut self, state: AppState) -> Result<DetachedTurn, AppError> {
        let chunks = self
            .handle
            .chunks()
            .ok_or_else(|| AppError::Internal("turn chunks already taken".to_string()))?;
        let chat_id = self.chat.id;
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(async move {
            let result = self.finish(&state).await;
            if let Err(e) = &result {
                warn!(chat_id = %chat_id, error = %e, "turn ended with an error");
            }
            if outcome_tx.send(result).is_err() {
                info!(chat_id = %chat_id, "turn finished after its client went away");
            }
        });

        Ok(DetachedTurn {
            chat_id,
            chunks,
            outcome: outcome_rx,
        })
    }

    /// Wait for the turn to end and store the assistant reply.
    ///
    /// The turn slot is released when this returns.
    pub async fn finish(self, state: &AppState) -> Result<TurnOutcome, AppError> {
        let StartedTurn { chat, handle, lease } = self;
        let outcome = handle.join().await;
        drop(lease);

        let outcome = outcome?;
        if let TurnOutcome::Cancelled { partial } = &outcome {
            info!(chat_id = %chat.id, chars = partial.len(), "turn stopped by user");
        }

        if !outcome.text().is_empty() {
            let reply = ChatMessage {
                id: Uuid::now_v7(),
                chat_id: chat.id,
                role: MessageRole::Assistant,
                parts: vec![MessagePart::Text {
                    text: outcome.text().to_string(),
                }],
                attachments: Vec::new(),
                created_at: now(),
            };
            state.chat_service.save_messages(vec![reply]).await?;
        }
        Ok(outcome)
    }
}

/// Validate and start a turn for `user`.
///
/// `visibility` applies only when the turn creates the chat.
pub async fn start_turn(
    state: &AppState,
    user: &User,
    request: TurnRequest,
    visibility: Visibility,
) -> Result<StartedTurn, AppError> {
    if request.message.role != MessageRole::User {
        return Err(AppError::Validation(
            "the turn message must have the user role".to_string(),
        ));
    }
    if request.message.parts.is_empty() && request.message.attachments.is_empty() {
        return Err(AppError::Validation("the turn message is empty".to_string()));
    }

    state.chat_service.check_rate_limit(user).await?;

    // The server clock orders stored messages, not the client's.
    let mut incoming = request.message.clone();
    incoming.created_at = None;
    let message = incoming.into_chat_message(request.id, now());
    let chat = state
        .chat_service
        .ensure_chat_for_turn(request.id, user.id, &message, visibility)
        .await?;

    let lease = state.turns.begin(chat.id).inspect_err(|_| {
        warn!(chat_id = %chat.id, "turn rejected, another turn is running");
    })?;

    state.chat_service.save_messages(vec![message]).await?;

    let handle = TurnTask::new(state.transport.clone(), request)
        .timeout(Duration::from_secs(state.config.turn.timeout_secs))
        .cancellation(lease.token())
        .spawn();
    info!(chat_id = %chat.id, turn_id = %handle.id(), user_id = %user.id, "turn started");

    Ok(StartedTurn {
        chat,
        handle,
        lease,
    })
}
