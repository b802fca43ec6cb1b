//! SQLite vote repository implementation.

use parley_core::repository::vote::VoteRepository;
use parley_types::chat::Vote;
use parley_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{parse_uuid, query_failed};

/// SQLite-backed implementation of `VoteRepository`.
#[derive(Clone)]
pub struct SqliteVoteRepository {
    pool: DatabasePool,
}

impl SqliteVoteRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct VoteRow {
    chat_id: String,
    message_id: String,
    is_upvoted: bool,
}

impl VoteRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            chat_id: row.try_get("chat_id")?,
            message_id: row.try_get("message_id")?,
            is_upvoted: row.try_get("is_upvoted")?,
        })
    }

    fn into_vote(self) -> Result<Vote, RepositoryError> {
        Ok(Vote {
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            message_id: parse_uuid(&self.message_id, "message_id")?,
            is_upvoted: self.is_upvoted,
        })
    }
}

impl VoteRepository for SqliteVoteRepository {
    async fn upsert_vote(&self, vote: &Vote) -> Result<Vote, RepositoryError> {
        sqlx::query(
            "INSERT INTO votes (chat_id, message_id, is_upvoted) VALUES (?, ?, ?)
             ON CONFLICT (chat_id, message_id) DO UPDATE SET is_upvoted = excluded.is_upvoted",
        )
        .bind(vote.chat_id.to_string())
        .bind(vote.message_id.to_string())
        .bind(vote.is_upvoted)
        .execute(&self.pool.writer)
        .await
        .map_err(query_failed("upsert_vote"))?;

        Ok(vote.clone())
    }

    async fn get_votes_by_chat_id(&self, chat_id: &Uuid) -> Result<Vec<Vote>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM votes WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_failed("get_votes_by_chat_id"))?;

        let mut votes = Vec::with_capacity(rows.len());
        for row in &rows {
            let vote_row = VoteRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            votes.push(vote_row.into_vote()?);
        }
        Ok(votes)
    }
}
