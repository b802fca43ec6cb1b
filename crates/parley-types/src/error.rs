use thiserror::Error;
use uuid::Uuid;

/// Errors from repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to chat, message, vote and document operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("chat with id {0} not found")]
    CursorNotFound(Uuid),

    #[error("invalid page request: {0}")]
    InvalidPage(String),

    #[error("not allowed to access this chat")]
    Forbidden,

    #[error("message limit of {limit} per day reached")]
    RateLimited { limit: u32 },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Store(#[from] RepositoryError),
}

/// Errors from the auth provider. A missing session is not an error.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token generation failed")]
    TokenGeneration,

    #[error("storage error: {0}")]
    Store(#[from] RepositoryError),
}

/// Errors from the streaming turn transport.
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("stream rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("malformed chunk: {0}")]
    Malformed(String),

    #[error("a turn is already in progress")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_cursor_not_found_names_the_id() {
        let id = Uuid::nil();
        let err = ChatError::CursorNotFound(id);
        assert_eq!(err.to_string(), format!("chat with id {id} not found"));
    }

    #[test]
    fn test_store_error_converts() {
        let err: ChatError = RepositoryError::Connection.into();
        assert!(matches!(err, ChatError::Store(RepositoryError::Connection)));
        assert_eq!(err.to_string(), "storage error: database connection error");
    }

    #[test]
    fn test_turn_error_display() {
        let err = TurnError::Rejected {
            status: 429,
            body: "slow down".to_string(),
        };
        assert!(err.to_string().contains("429"));
    }
}
