//! Cursor pagination types for the chat history listing.
//!
//! Chats are listed newest first in the total order `(created_at DESC, id DESC)`.
//! A cursor is the id of a chat already shown to the client; the next window
//! is anchored strictly after or before that chat's position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::Chat;

/// Which side of the anchor chat a page is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", content = "id", rename_all = "snake_case")]
pub enum PageCursor {
    /// Chats newer than the anchor.
    StartingAfter(Uuid),
    /// Chats older than the anchor.
    EndingBefore(Uuid),
}

impl PageCursor {
    pub fn anchor(&self) -> Uuid {
        match self {
            PageCursor::StartingAfter(id) | PageCursor::EndingBefore(id) => *id,
        }
    }
}

/// A request for one page of the caller's chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: u32,
    pub starting_after: Option<Uuid>,
    pub ending_before: Option<Uuid>,
}

impl PageRequest {
    /// First page of `limit` chats.
    pub fn first(limit: u32) -> Self {
        Self {
            limit,
            starting_after: None,
            ending_before: None,
        }
    }

    pub fn after(limit: u32, id: Uuid) -> Self {
        Self {
            limit,
            starting_after: Some(id),
            ending_before: None,
        }
    }

    pub fn before(limit: u32, id: Uuid) -> Self {
        Self {
            limit,
            starting_after: None,
            ending_before: Some(id),
        }
    }

    /// The cursor this request carries, if any.
    ///
    /// At most one of `starting_after` / `ending_before` may be set.
    pub fn cursor(&self) -> Result<Option<PageCursor>, String> {
        match (self.starting_after, self.ending_before) {
            (Some(_), Some(_)) => {
                Err("only one of starting_after or ending_before may be provided".to_string())
            }
            (Some(id), None) => Ok(Some(PageCursor::StartingAfter(id))),
            (None, Some(id)) => Ok(Some(PageCursor::EndingBefore(id))),
            (None, None) => Ok(None),
        }
    }
}

/// A resolved cursor position used to filter the store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBound {
    /// `(created_at, id) > (at, id)`
    After { created_at: DateTime<Utc>, id: Uuid },
    /// `(created_at, id) < (at, id)`
    Before { created_at: DateTime<Utc>, id: Uuid },
}

impl PageBound {
    /// Whether a chat lies strictly on the requested side of the anchor.
    pub fn admits(&self, chat: &Chat) -> bool {
        match *self {
            PageBound::After { created_at, id } => (chat.created_at, chat.id) > (created_at, id),
            PageBound::Before { created_at, id } => (chat.created_at, chat.id) < (created_at, id),
        }
    }
}

/// One page of chats plus whether more exist in the same direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    pub chats: Vec<Chat>,
    pub has_more: bool,
}

impl ChatPage {
    /// Build a page from a `limit + 1` over-fetch.
    pub fn from_overfetch(mut fetched: Vec<Chat>, limit: usize) -> Self {
        let has_more = fetched.len() > limit;
        fetched.truncate(limit);
        Self {
            chats: fetched,
            has_more,
        }
    }

    pub fn empty() -> Self {
        Self {
            chats: Vec::new(),
            has_more: false,
        }
    }
}
