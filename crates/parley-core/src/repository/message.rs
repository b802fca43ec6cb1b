//! MessageRepository trait definition.

use chrono::{DateTime, Utc};
use parley_types::chat::ChatMessage;
use parley_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chat message persistence.
pub trait MessageRepository: Send + Sync {
    /// Insert a batch of messages atomically.
    fn save_messages(
        &self,
        messages: &[ChatMessage],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All messages of a chat, ordered by created_at ASC.
    fn get_messages_by_chat_id(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    fn get_message_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// Delete every message of `chat_id` with `created_at > timestamp`.
    ///
    /// Messages at exactly `timestamp` are kept. Votes on removed messages go too.
    fn delete_messages_by_chat_id_after_timestamp(
        &self,
        chat_id: &Uuid,
        timestamp: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Count user-role messages in chats owned by `user_id` created at or after `since`.
    fn count_user_messages_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;
}
