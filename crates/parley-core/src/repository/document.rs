//! DocumentRepository trait definition.
//!
//! Covers two entity families:
//! - **Documents:** versioned artifact content, keyed by `(id, created_at)`.
//! - **Suggestions:** proposed edits against one document version.

use chrono::{DateTime, Utc};
use parley_types::document::{Document, Suggestion};
use parley_types::error::RepositoryError;
use uuid::Uuid;

pub trait DocumentRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Insert a new document version.
    fn save_document(
        &self,
        document: &Document,
    ) -> impl std::future::Future<Output = Result<Document, RepositoryError>> + Send;

    /// All versions of a document, oldest first.
    fn get_documents_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, RepositoryError>> + Send;

    /// The newest version of a document.
    fn get_document_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Document>, RepositoryError>> + Send;

    /// Delete versions with `created_at > timestamp` and their suggestions.
    fn delete_documents_by_id_after_timestamp(
        &self,
        id: &Uuid,
        timestamp: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Suggestions
    // -----------------------------------------------------------------------

    fn save_suggestions(
        &self,
        suggestions: &[Suggestion],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Suggestions across all versions of a document, newest first.
    fn get_suggestions_by_document_id(
        &self,
        document_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Suggestion>, RepositoryError>> + Send;
}
