//! ChatRepository trait definition.

use chrono::{DateTime, Utc};
use parley_types::chat::{Chat, Visibility};
use parley_types::error::RepositoryError;
use parley_types::page::PageBound;
use uuid::Uuid;

/// Repository trait for chat persistence.
///
/// Implementations live in parley-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// Insert a new chat.
    fn save_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Point lookup by id, regardless of owner.
    fn get_chat_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// Delete a chat and everything hanging off it. Returns the deleted row.
    fn delete_chat_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Change a chat's visibility. Returns the updated row.
    fn update_chat_visibility(
        &self,
        id: &Uuid,
        visibility: Visibility,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Fetch up to `fetch_limit` of a user's chats ordered by
    /// `(created_at DESC, id DESC)`, optionally restricted to one side of a bound.
    fn list_chats_by_user(
        &self,
        user_id: &Uuid,
        bound: Option<PageBound>,
        fetch_limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    /// Resolve a cursor id to its creation time, scoped to the owning user.
    fn get_chat_created_at(
        &self,
        user_id: &Uuid,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<DateTime<Utc>>, RepositoryError>> + Send;
}
