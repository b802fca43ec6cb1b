//! Chat turn types: the request sent to the streaming transport, the chunks
//! it streams back, and the lifecycle state observed by the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{Attachment, ChatMessage, MessagePart, MessageRole};

/// A message as the web client sends it (camelCase, attachments under the
/// `experimental_attachments` key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    #[serde(default, rename = "experimental_attachments")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UiMessage {
    /// Bind the wire message to a chat, stamping `now` when the client sent no time.
    pub fn into_chat_message(self, chat_id: Uuid, now: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id: self.id,
            chat_id,
            role: self.role,
            parts: self.parts,
            attachments: self.attachments,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

impl From<&ChatMessage> for UiMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            role: message.role,
            parts: message.parts.clone(),
            attachments: message.attachments.clone(),
            created_at: Some(message.created_at),
        }
    }
}

/// Body of a chat turn: only the newest message travels, the server loads
/// the rest of the history itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub id: Uuid,
    pub message: UiMessage,
    pub selected_chat_model: String,
}

/// Why the model stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
    #[serde(other)]
    Other,
}

/// One increment delivered by the streaming transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TurnChunk {
    TextDelta {
        #[serde(rename = "textDelta")]
        text_delta: String,
    },
    Finish {
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
    },
}

/// Lifecycle of one turn as seen by the UI layer.
///
/// `Idle -> Submitting -> Streaming -> Idle`, with `Error` reachable from
/// `Submitting` and `Streaming`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    Submitting,
    Streaming,
    Error {
        message: String,
    },
}

impl TurnState {
    /// Whether a turn is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, TurnState::Submitting | TurnState::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// A transient notification surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub description: String,
}

impl Toast {
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            description: description.into(),
        }
    }
}
