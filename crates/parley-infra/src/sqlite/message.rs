//! SQLite message repository implementation.
//!
//! Message parts and attachments are stored as JSON text columns.

use chrono::{DateTime, Utc};
use parley_core::repository::message::MessageRepository;
use parley_types::chat::{Attachment, ChatMessage, MessagePart, MessageRole};
use parley_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_failed};

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct MessageRow {
    id: String,
    chat_id: String,
    role: String,
    parts: String,
    attachments: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            parts: row.try_get("parts")?,
            attachments: row.try_get("attachments")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let parts: Vec<MessagePart> = serde_json::from_str(&self.parts)
            .map_err(|e| RepositoryError::Query(format!("invalid message parts: {e}")))?;
        let attachments: Vec<Attachment> = serde_json::from_str(&self.attachments)
            .map_err(|e| RepositoryError::Query(format!("invalid attachments: {e}")))?;

        Ok(ChatMessage {
            id: parse_uuid(&self.id, "message id")?,
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            role,
            parts,
            attachments,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn rows_to_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ChatMessage>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let msg_row =
            MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        messages.push(msg_row.into_message()?);
    }
    Ok(messages)
}

impl MessageRepository for SqliteMessageRepository {
    async fn save_messages(&self, messages: &[ChatMessage]) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(query_failed("save_messages"))?;

        for message in messages {
            let parts = serde_json::to_string(&message.parts)
                .map_err(|e| RepositoryError::Query(format!("encode parts: {e}")))?;
            let attachments = serde_json::to_string(&message.attachments)
                .map_err(|e| RepositoryError::Query(format!("encode attachments: {e}")))?;

            sqlx::query(
                "INSERT INTO messages (id, chat_id, role, parts, attachments, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(message.id.to_string())
            .bind(message.chat_id.to_string())
            .bind(message.role.to_string())
            .bind(parts)
            .bind(attachments)
            .bind(format_datetime(&message.created_at))
            .execute(&mut *tx)
            .await
            .map_err(query_failed("save_messages"))?;
        }

        tx.commit().await.map_err(query_failed("save_messages"))?;
        Ok(())
    }

    async fn get_messages_by_chat_id(
        &self,
        chat_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE chat_id = ? ORDER BY created_at ASC, id ASC")
            .bind(chat_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_failed("get_messages_by_chat_id"))?;

        rows_to_messages(&rows)
    }

    async fn get_message_by_id(&self, id: &Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_failed("get_message_by_id"))?;

        match row {
            Some(row) => {
                let msg_row =
                    MessageRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(msg_row.into_message()?))
            }
            None => Ok(None),
        }
    }

    async fn delete_messages_by_chat_id_after_timestamp(
        &self,
        chat_id: &Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        // Votes on the removed messages cascade through the message FK.
        let rows = sqlx::query(
            "DELETE FROM messages WHERE chat_id = ? AND created_at > ? RETURNING *",
        )
        .bind(chat_id.to_string())
        .bind(format_datetime(&timestamp))
        .fetch_all(&self.pool.writer)
        .await
        .map_err(query_failed("delete_messages_by_chat_id_after_timestamp"))?;

        let mut deleted = rows_to_messages(&rows)?;
        deleted.sort_by_key(|m| m.created_at);
        Ok(deleted)
    }

    async fn count_user_messages_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m
             JOIN chats c ON c.id = m.chat_id
             WHERE c.user_id = ? AND m.role = 'user' AND m.created_at >= ?",
        )
        .bind(user_id.to_string())
        .bind(format_datetime(&since))
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_failed("count_user_messages_since"))?;

        Ok(count as u32)
    }
}
