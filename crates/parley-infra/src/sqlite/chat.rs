//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `parley-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reader for SELECT and
//! writer for everything else.

use parley_core::repository::chat::ChatRepository;
use parley_types::chat::{Chat, Visibility};
use parley_types::error::RepositoryError;
use parley_types::page::PageBound;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_failed};

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRow {
    id: String,
    title: String,
    user_id: String,
    created_at: String,
    visibility: String,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            visibility: row.try_get("visibility")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        let visibility: Visibility = self
            .visibility
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Chat {
            id: parse_uuid(&self.id, "chat id")?,
            title: self.title,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            created_at: parse_datetime(&self.created_at)?,
            visibility,
        })
    }
}

fn rows_to_chats(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Chat>, RepositoryError> {
    let mut chats = Vec::with_capacity(rows.len());
    for row in rows {
        let chat_row = ChatRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        chats.push(chat_row.into_chat()?);
    }
    Ok(chats)
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn save_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        sqlx::query(
            "INSERT INTO chats (id, title, user_id, created_at, visibility) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(chat.id.to_string())
        .bind(&chat.title)
        .bind(chat.user_id.to_string())
        .bind(format_datetime(&chat.created_at))
        .bind(chat.visibility.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!("chat {} already exists", chat.id));
                }
            }
            query_failed("save_chat")(e)
        })?;

        Ok(chat.clone())
    }

    async fn get_chat_by_id(&self, id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_failed("get_chat_by_id"))?;

        match row {
            Some(row) => {
                let chat_row =
                    ChatRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(chat_row.into_chat()?))
            }
            None => Ok(None),
        }
    }

    async fn delete_chat_by_id(&self, id: &Uuid) -> Result<Chat, RepositoryError> {
        // Messages and votes go with the chat via ON DELETE CASCADE.
        let row = sqlx::query("DELETE FROM chats WHERE id = ? RETURNING *")
            .bind(id.to_string())
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(query_failed("delete_chat_by_id"))?
            .ok_or(RepositoryError::NotFound)?;

        ChatRow::from_row(&row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .into_chat()
    }

    async fn update_chat_visibility(
        &self,
        id: &Uuid,
        visibility: Visibility,
    ) -> Result<Chat, RepositoryError> {
        let row = sqlx::query("UPDATE chats SET visibility = ? WHERE id = ? RETURNING *")
            .bind(visibility.to_string())
            .bind(id.to_string())
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(query_failed("update_chat_visibility"))?
            .ok_or(RepositoryError::NotFound)?;

        ChatRow::from_row(&row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .into_chat()
    }

    async fn list_chats_by_user(
        &self,
        user_id: &Uuid,
        bound: Option<PageBound>,
        fetch_limit: u32,
    ) -> Result<Vec<Chat>, RepositoryError> {
        // Row-value comparison keeps the (created_at, id) order strict when
        // timestamps tie.
        let (filter, anchor) = match bound {
            None => ("", None),
            Some(PageBound::After { created_at, id }) => {
                (" AND (created_at, id) > (?, ?)", Some((created_at, id)))
            }
            Some(PageBound::Before { created_at, id }) => {
                (" AND (created_at, id) < (?, ?)", Some((created_at, id)))
            }
        };
        let sql = format!(
            "SELECT * FROM chats WHERE user_id = ?{filter} \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        );

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        if let Some((created_at, id)) = anchor {
            query = query.bind(format_datetime(&created_at)).bind(id.to_string());
        }
        let rows = query
            .bind(i64::from(fetch_limit))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_failed("list_chats_by_user"))?;

        rows_to_chats(&rows)
    }

    async fn get_chat_created_at(
        &self,
        user_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let created_at: Option<String> =
            sqlx::query_scalar("SELECT created_at FROM chats WHERE id = ? AND user_id = ?")
                .bind(id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(query_failed("get_chat_created_at"))?;

        created_at.as_deref().map(parse_datetime).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::{insert_user, test_pool};
    use chrono::TimeZone;
    use parley_core::chat::pagination::list_chats;
    use parley_types::error::ChatError;
    use parley_types::page::PageRequest;

    fn make_chat(user_id: Uuid, title: &str, secs: i64) -> Chat {
        Chat {
            id: Uuid::now_v7(),
            title: title.to_string(),
            user_id,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            visibility: Visibility::Private,
        }
    }

    #[tokio::test]
    async fn test_save_and_get_chat() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user = insert_user(&pool, true).await;

        let chat = make_chat(user, "Hello", 1_700_000_000);
        repo.save_chat(&chat).await.unwrap();

        let found = repo.get_chat_by_id(&chat.id).await.unwrap().unwrap();
        assert_eq!(found, chat);
        assert!(repo.get_chat_by_id(&Uuid::now_v7()).await.unwrap().is_none());

        let err = repo.save_chat(&chat).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_visibility_and_delete() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user = insert_user(&pool, false).await;
        let chat = make_chat(user, "Share me", 1_700_000_000);
        repo.save_chat(&chat).await.unwrap();

        let updated = repo
            .update_chat_visibility(&chat.id, Visibility::Public)
            .await
            .unwrap();
        assert_eq!(updated.visibility, Visibility::Public);

        let deleted = repo.delete_chat_by_id(&chat.id).await.unwrap();
        assert_eq!(deleted.id, chat.id);
        assert!(matches!(
            repo.delete_chat_by_id(&chat.id).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.update_chat_visibility(&chat.id, Visibility::Private).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_pagination_scenarios() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user = insert_user(&pool, false).await;
        let other = insert_user(&pool, false).await;

        let a = make_chat(user, "A", 3);
        let b = make_chat(user, "B", 2);
        let c = make_chat(user, "C", 1);
        for chat in [&c, &a, &b, &make_chat(other, "X", 5)] {
            repo.save_chat(chat).await.unwrap();
        }

        let titles = |page: &parley_types::page::ChatPage| {
            page.chats.iter().map(|c| c.title.clone()).collect::<Vec<_>>()
        };

        let page = list_chats(&repo, &user, &PageRequest::first(2), 100).await.unwrap();
        assert_eq!(titles(&page), ["A", "B"]);
        assert!(page.has_more);

        let page = list_chats(&repo, &user, &PageRequest::after(2, b.id), 100).await.unwrap();
        assert_eq!(titles(&page), ["A"]);
        assert!(!page.has_more);

        let page = list_chats(&repo, &user, &PageRequest::before(2, b.id), 100).await.unwrap();
        assert_eq!(titles(&page), ["C"]);
        assert!(!page.has_more);

        let page = list_chats(&repo, &user, &PageRequest::before(1, a.id), 100).await.unwrap();
        assert_eq!(titles(&page), ["B"]);
        assert!(page.has_more);

        let missing = Uuid::now_v7();
        let err = list_chats(&repo, &user, &PageRequest::after(2, missing), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::CursorNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_pagination_breaks_timestamp_ties_by_id() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let user = insert_user(&pool, false).await;

        let mut chats: Vec<Chat> = (0..5).map(|i| make_chat(user, &format!("{i}"), 42)).collect();
        for chat in &chats {
            repo.save_chat(chat).await.unwrap();
        }
        chats.sort_by(|x, y| y.id.cmp(&x.id));

        let first = list_chats(&repo, &user, &PageRequest::first(2), 100).await.unwrap();
        let second = list_chats(
            &repo,
            &user,
            &PageRequest::before(2, first.chats[1].id),
            100,
        )
        .await
        .unwrap();
        let third = list_chats(
            &repo,
            &user,
            &PageRequest::before(2, second.chats[1].id),
            100,
        )
        .await
        .unwrap();

        let walked: Vec<Uuid> = first
            .chats
            .iter()
            .chain(&second.chats)
            .chain(&third.chats)
            .map(|c| c.id)
            .collect();
        let expected: Vec<Uuid> = chats.iter().map(|c| c.id).collect();
        assert_eq!(walked, expected);
        assert!(!third.has_more);
    }

    #[tokio::test]
    async fn test_created_at_lookup_is_owner_scoped() {
        let pool = test_pool().await;
        let repo = SqliteChatRepository::new(pool.clone());
        let owner = insert_user(&pool, false).await;
        let stranger = insert_user(&pool, false).await;
        let chat = make_chat(owner, "mine", 100);
        repo.save_chat(&chat).await.unwrap();

        assert_eq!(
            repo.get_chat_created_at(&owner, &chat.id).await.unwrap(),
            Some(chat.created_at)
        );
        assert_eq!(
            repo.get_chat_created_at(&stranger, &chat.id).await.unwrap(),
            None
        );
    }
}
