//! SQLite document and suggestion repository implementation.
//!
//! Documents are versioned by `(id, created_at)`; suggestions reference one
//! version through a composite foreign key and cascade with it.

use chrono::{DateTime, Utc};
use parley_core::repository::document::DocumentRepository;
use parley_types::document::{ArtifactKind, Document, Suggestion};
use parley_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_failed};

/// SQLite-backed implementation of `DocumentRepository`.
#[derive(Clone)]
pub struct SqliteDocumentRepository {
    pool: DatabasePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types
// ---------------------------------------------------------------------------

struct DocumentRow {
    id: String,
    created_at: String,
    title: String,
    content: Option<String>,
    kind: String,
    user_id: String,
}

impl DocumentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            kind: row.try_get("kind")?,
            user_id: row.try_get("user_id")?,
        })
    }

    fn into_document(self) -> Result<Document, RepositoryError> {
        let kind: ArtifactKind = self
            .kind
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Document {
            id: parse_uuid(&self.id, "document id")?,
            created_at: parse_datetime(&self.created_at)?,
            title: self.title,
            kind,
            content: self.content,
            user_id: parse_uuid(&self.user_id, "user_id")?,
        })
    }
}

struct SuggestionRow {
    id: String,
    document_id: String,
    document_created_at: String,
    original_text: String,
    suggested_text: String,
    description: Option<String>,
    is_resolved: bool,
    user_id: String,
    created_at: String,
}

impl SuggestionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            document_id: row.try_get("document_id")?,
            document_created_at: row.try_get("document_created_at")?,
            original_text: row.try_get("original_text")?,
            suggested_text: row.try_get("suggested_text")?,
            description: row.try_get("description")?,
            is_resolved: row.try_get("is_resolved")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_suggestion(self) -> Result<Suggestion, RepositoryError> {
        Ok(Suggestion {
            id: parse_uuid(&self.id, "suggestion id")?,
            document_id: parse_uuid(&self.document_id, "document_id")?,
            document_created_at: parse_datetime(&self.document_created_at)?,
            original_text: self.original_text,
            suggested_text: self.suggested_text,
            description: self.description,
            is_resolved: self.is_resolved,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn rows_to_documents(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Document>, RepositoryError> {
    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        let doc_row =
            DocumentRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        documents.push(doc_row.into_document()?);
    }
    Ok(documents)
}

// ---------------------------------------------------------------------------
// DocumentRepository implementation
// ---------------------------------------------------------------------------

impl DocumentRepository for SqliteDocumentRepository {
    async fn save_document(&self, document: &Document) -> Result<Document, RepositoryError> {
        sqlx::query(
            "INSERT INTO documents (id, created_at, title, content, kind, user_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(document.id.to_string())
        .bind(format_datetime(&document.created_at))
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.kind.to_string())
        .bind(document.user_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!(
                        "document {} already has a version at {}",
                        document.id,
                        format_datetime(&document.created_at)
                    ));
                }
            }
            query_failed("save_document")(e)
        })?;

        Ok(document.clone())
    }

    async fn get_documents_by_id(&self, id: &Uuid) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM documents WHERE id = ? ORDER BY created_at ASC")
            .bind(id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_failed("get_documents_by_id"))?;

        rows_to_documents(&rows)
    }

    async fn get_document_by_id(&self, id: &Uuid) -> Result<Option<Document>, RepositoryError> {
        let row =
            sqlx::query("SELECT * FROM documents WHERE id = ? ORDER BY created_at DESC LIMIT 1")
                .bind(id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(query_failed("get_document_by_id"))?;

        match row {
            Some(row) => {
                let doc_row =
                    DocumentRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(doc_row.into_document()?))
            }
            None => Ok(None),
        }
    }

    async fn delete_documents_by_id_after_timestamp(
        &self,
        id: &Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Document>, RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(query_failed("delete_documents_by_id_after_timestamp"))?;

        sqlx::query("DELETE FROM suggestions WHERE document_id = ? AND document_created_at > ?")
            .bind(id.to_string())
            .bind(format_datetime(&timestamp))
            .execute(&mut *tx)
            .await
            .map_err(query_failed("delete_documents_by_id_after_timestamp"))?;

        let rows =
            sqlx::query("DELETE FROM documents WHERE id = ? AND created_at > ? RETURNING *")
                .bind(id.to_string())
                .bind(format_datetime(&timestamp))
                .fetch_all(&mut *tx)
                .await
                .map_err(query_failed("delete_documents_by_id_after_timestamp"))?;

        tx.commit()
            .await
            .map_err(query_failed("delete_documents_by_id_after_timestamp"))?;

        let mut deleted = rows_to_documents(&rows)?;
        deleted.sort_by_key(|d| d.created_at);
        Ok(deleted)
    }

    async fn save_suggestions(&self, suggestions: &[Suggestion]) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(query_failed("save_suggestions"))?;

        for suggestion in suggestions {
            sqlx::query(
                "INSERT INTO suggestions (id, document_id, document_created_at, original_text,
                     suggested_text, description, is_resolved, user_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(suggestion.id.to_string())
            .bind(suggestion.document_id.to_string())
            .bind(format_datetime(&suggestion.document_created_at))
            .bind(&suggestion.original_text)
            .bind(&suggestion.suggested_text)
            .bind(&suggestion.description)
            .bind(suggestion.is_resolved)
            .bind(suggestion.user_id.to_string())
            .bind(format_datetime(&suggestion.created_at))
            .execute(&mut *tx)
            .await
            .map_err(query_failed("save_suggestions"))?;
        }

        tx.commit().await.map_err(query_failed("save_suggestions"))?;
        Ok(())
    }

    async fn get_suggestions_by_document_id(
        &self,
        document_id: &Uuid,
    ) -> Result<Vec<Suggestion>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM suggestions WHERE document_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(document_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_failed("get_suggestions_by_document_id"))?;

        let mut suggestions = Vec::with_capacity(rows.len());
        for row in &rows {
            let s_row =
                SuggestionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            suggestions.push(s_row.into_suggestion()?);
        }
        Ok(suggestions)
    }
}
