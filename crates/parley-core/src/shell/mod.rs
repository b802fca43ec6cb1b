//! Headless chat shell.
//!
//! `ChatShell` holds the state one open chat needs on the client side: the
//! draft input and attachments, the visible messages and votes, the turn
//! state, pending toasts and the history cache. It performs no I/O. A driver
//! feeds it the chunks and the end of each turn (see [`crate::turn`]).

pub mod history;

use chrono::Utc;
use parley_types::chat::{Attachment, MessagePart, MessageRole, Visibility, Vote};
use parley_types::turn::{Toast, TurnChunk, TurnRequest, TurnState, UiMessage};
use parley_types::user::UserType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use self::history::HistoryCache;

/// Why a submit was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    #[error("this chat is read-only")]
    ReadOnly,

    #[error("a turn is already in progress")]
    Busy,

    #[error("nothing to send")]
    EmptyInput,
}

/// Fixed properties of the open chat. Serialized as the page bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellOptions {
    #[serde(rename = "id")]
    pub chat_id: Uuid,
    pub selected_chat_model: String,
    #[serde(rename = "selectedVisibilityType")]
    pub visibility: Visibility,
    pub is_readonly: bool,
    pub user_type: UserType,
}

#[derive(Debug)]
pub struct ChatShell {
    options: ShellOptions,
    input: String,
    attachments: Vec<Attachment>,
    messages: Vec<UiMessage>,
    votes: Vec<Vote>,
    artifact_visible: bool,
    state: TurnState,
    toasts: Vec<Toast>,
    history: HistoryCache,
    /// Id of the assistant message being streamed into.
    streaming_message: Option<Uuid>,
}

impl ChatShell {
    pub fn new(options: ShellOptions, initial_messages: Vec<UiMessage>) -> Self {
        Self {
            options,
            input: String::new(),
            attachments: Vec::new(),
            messages: initial_messages,
            votes: Vec::new(),
            artifact_visible: false,
            state: TurnState::Idle,
            toasts: Vec::new(),
            history: HistoryCache::new(),
            streaming_message: None,
        }
    }

    pub fn chat_id(&self) -> Uuid {
        self.options.chat_id
    }

    pub fn options(&self) -> &ShellOptions {
        &self.options
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn messages(&self) -> &[UiMessage] {
        &self.messages
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryCache {
        &mut self.history
    }

    pub fn is_artifact_visible(&self) -> bool {
        self.artifact_visible
    }

    pub fn set_artifact_visible(&mut self, visible: bool) {
        self.artifact_visible = visible;
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.options.visibility = visibility;
    }

    // --- Draft ---

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Remove the attachment with `url`. Returns whether one was removed.
    pub fn remove_attachment(&mut self, url: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.url != url);
        self.attachments.len() != before
    }

    // --- Votes ---

    pub fn set_votes(&mut self, votes: Vec<Vote>) {
        self.votes = votes;
    }

    pub fn vote_for(&self, message_id: &Uuid) -> Option<&Vote> {
        self.votes.iter().find(|v| v.message_id == *message_id)
    }

    // --- Turn lifecycle ---

    /// Turn the draft into a user message and start a turn.
    ///
    /// Allowed from `Idle` and `Error`. Returns the request to hand to the
    /// transport.
    pub fn submit(&mut self) -> Result<TurnRequest, ShellError> {
        if self.options.is_readonly {
            return Err(ShellError::ReadOnly);
        }
        if self.state.is_busy() {
            return Err(ShellError::Busy);
        }
        let text = self.input.trim();
        if text.is_empty() && self.attachments.is_empty() {
            return Err(ShellError::EmptyInput);
        }

        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(MessagePart::Text {
                text: text.to_string(),
            });
        }
        let message = UiMessage {
            id: Uuid::now_v7(),
            role: MessageRole::User,
            parts,
            attachments: std::mem::take(&mut self.attachments),
            created_at: Some(Utc::now()),
        };
        self.input.clear();
        self.messages.push(message.clone());
        self.streaming_message = None;
        self.state = TurnState::Submitting;

        Ok(TurnRequest {
            id: self.options.chat_id,
            message,
            selected_chat_model: self.options.selected_chat_model.clone(),
        })
    }

    /// Apply one streamed chunk. Ignored unless a turn is in flight.
    pub fn apply_chunk(&mut self, chunk: &TurnChunk) {
        if !self.state.is_busy() {
            return;
        }
        self.state = TurnState::Streaming;

        let TurnChunk::TextDelta { text_delta } = chunk else {
            return;
        };
        let id = match self.streaming_message {
            Some(id) => id,
            None => {
                let id = Uuid::now_v7();
                self.messages.push(UiMessage {
                    id,
                    role: MessageRole::Assistant,
                    parts: vec![MessagePart::Text {
                        text: String::new(),
                    }],
                    attachments: Vec::new(),
                    created_at: Some(Utc::now()),
                });
                self.streaming_message = Some(id);
                id
            }
        };
        if let Some(MessagePart::Text { text }) = self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.id == id)
            .and_then(|m| m.parts.last_mut())
        {
            text.push_str(text_delta);
        }
    }

    /// The turn ended normally. History is refetched on next view.
    pub fn finish(&mut self) {
        self.state = TurnState::Idle;
        self.streaming_message = None;
        self.history.invalidate();
    }

    /// The turn failed; surface one error toast.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.toasts.push(Toast::error(message.clone()));
        self.state = TurnState::Error { message };
        self.streaming_message = None;
    }

    /// Stop the running turn. Returns whether one was running.
    ///
    /// Text streamed so far stays in the transcript.
    pub fn stop(&mut self) -> bool {
        if !self.state.is_busy() {
            return false;
        }
        self.state = TurnState::Idle;
        self.streaming_message = None;
        true
    }

    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }
}
