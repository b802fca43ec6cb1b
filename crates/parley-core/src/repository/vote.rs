//! VoteRepository trait definition.

use parley_types::chat::Vote;
use parley_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for message votes.
pub trait VoteRepository: Send + Sync {
    /// Insert or replace the vote for `(chat_id, message_id)`. Last write wins.
    fn upsert_vote(
        &self,
        vote: &Vote,
    ) -> impl std::future::Future<Output = Result<Vote, RepositoryError>> + Send;

    fn get_votes_by_chat_id(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Vote>, RepositoryError>> + Send;
}
