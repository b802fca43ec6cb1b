//! Document service.
//!
//! A document id names a sequence of versions; each save appends a version
//! stamped with the current time. Only the author may read, extend or prune
//! a document, and suggestions are attached to one specific version.

use chrono::{DateTime, Utc};
use parley_types::document::{ArtifactKind, Document, Suggestion};
use parley_types::error::ChatError;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::chat::{now, truncate};
use crate::repository::document::DocumentRepository;

/// Input for one proposed edit.
#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub original_text: String,
    pub suggested_text: String,
    pub description: Option<String>,
}

pub struct DocumentService<D: DocumentRepository> {
    repo: D,
}

impl<D: DocumentRepository> DocumentService<D> {
    pub fn new(repo: D) -> Self {
        Self { repo }
    }

    /// Append a new version of document `id`.
    ///
    /// The first save of an id creates the document. Later saves must come
    /// from the same author.
    pub async fn save_document(
        &self,
        id: Uuid,
        user_id: Uuid,
        title: String,
        kind: ArtifactKind,
        content: Option<String>,
    ) -> Result<Document, ChatError> {
        if title.trim().is_empty() {
            return Err(ChatError::Validation("document title must not be empty".into()));
        }
        if let Some(existing) = self.repo.get_document_by_id(&id).await? {
            if existing.user_id != user_id {
                warn!(document_id = %id, user_id = %user_id, "rejected write to foreign document");
                return Err(ChatError::Forbidden);
            }
        }

        let document = Document {
            id,
            created_at: now(),
            title,
            kind,
            content,
            user_id,
        };
        self.repo.save_document(&document).await.map_err(|e| {
            error!(document_id = %id, error = %e, "Failed to save document in database");
            ChatError::from(e)
        })
    }

    /// Every version of a document, oldest first.
    pub async fn get_documents_by_id(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Vec<Document>, ChatError> {
        let documents = self.repo.get_documents_by_id(id).await?;
        match documents.first() {
            None => Err(ChatError::NotFound("document")),
            Some(first) if first.user_id != *user_id => Err(ChatError::Forbidden),
            Some(_) => Ok(documents),
        }
    }

    /// The newest version of a document.
    pub async fn get_document_by_id(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Document, ChatError> {
        let document = self
            .repo
            .get_document_by_id(id)
            .await?
            .ok_or(ChatError::NotFound("document"))?;
        if document.user_id != *user_id {
            return Err(ChatError::Forbidden);
        }
        Ok(document)
    }

    /// Drop versions created strictly after `timestamp`, with their suggestions.
    pub async fn delete_documents_after(
        &self,
        id: &Uuid,
        user_id: &Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<Document>, ChatError> {
        self.get_document_by_id(id, user_id).await?;
        let deleted = self
            .repo
            .delete_documents_by_id_after_timestamp(id, truncate(timestamp))
            .await?;
        debug!(document_id = %id, count = deleted.len(), "deleted document versions");
        Ok(deleted)
    }

    /// Attach suggestions to the newest version of a document.
    pub async fn save_suggestions(
        &self,
        document_id: &Uuid,
        user_id: &Uuid,
        suggestions: Vec<NewSuggestion>,
    ) -> Result<Vec<Suggestion>, ChatError> {
        let document = self.get_document_by_id(document_id, user_id).await?;
        let created_at = now();
        let suggestions: Vec<Suggestion> = suggestions
            .into_iter()
            .map(|s| Suggestion {
                id: Uuid::now_v7(),
                document_id: document.id,
                document_created_at: document.created_at,
                original_text: s.original_text,
                suggested_text: s.suggested_text,
                description: s.description,
                is_resolved: false,
                user_id: *user_id,
                created_at,
            })
            .collect();
        if !suggestions.is_empty() {
            self.repo.save_suggestions(&suggestions).await?;
        }
        Ok(suggestions)
    }

    pub async fn get_suggestions_by_document_id(
        &self,
        document_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Vec<Suggestion>, ChatError> {
        let suggestions = self.repo.get_suggestions_by_document_id(document_id).await?;
        if suggestions.iter().any(|s| s.user_id != *user_id) {
            return Err(ChatError::Forbidden);
        }
        Ok(suggestions)
    }
}
