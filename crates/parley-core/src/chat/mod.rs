//! Chat history, messages and votes.
//!
//! `ChatService` carries the ownership and allowance rules; `pagination`
//! computes cursor pages over the history; `title` names new chats.

pub mod pagination;
pub mod service;
pub mod title;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at storage precision (microseconds).
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

/// Drop sub-microsecond precision so a value survives a storage round trip unchanged.
pub fn truncate(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// In-memory repositories shared by the service tests.
#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use parley_types::chat::{Chat, ChatMessage, MessagePart, MessageRole, Visibility, Vote};
    use parley_types::error::RepositoryError;
    use parley_types::page::PageBound;
    use uuid::Uuid;

    use crate::repository::chat::ChatRepository;
    use crate::repository::message::MessageRepository;
    use crate::repository::vote::VoteRepository;

    pub fn text_message(chat_id: Uuid, role: MessageRole, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            chat_id,
            role,
            parts: vec![MessagePart::Text {
                text: text.to_string(),
            }],
            attachments: Vec::new(),
            created_at: super::now(),
        }
    }

    #[derive(Clone, Default)]
    pub struct MemoryChatRepository {
        chats: Arc<Mutex<Vec<Chat>>>,
    }

    impl MemoryChatRepository {
        pub fn with_chats(chats: Vec<Chat>) -> Self {
            Self {
                chats: Arc::new(Mutex::new(chats)),
            }
        }

        fn owner_of(&self, chat_id: &Uuid) -> Option<Uuid> {
            self.chats
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == *chat_id)
                .map(|c| c.user_id)
        }
    }

    impl ChatRepository for MemoryChatRepository {
        async fn save_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
            let mut chats = self.chats.lock().unwrap();
            if chats.iter().any(|c| c.id == chat.id) {
                return Err(RepositoryError::Conflict(chat.id.to_string()));
            }
            chats.push(chat.clone());
            Ok(chat.clone())
        }

        async fn get_chat_by_id(&self, id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
            Ok(self
                .chats
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == *id)
                .cloned())
        }

        async fn delete_chat_by_id(&self, id: &Uuid) -> Result<Chat, RepositoryError> {
            let mut chats = self.chats.lock().unwrap();
            let pos = chats
                .iter()
                .position(|c| c.id == *id)
                .ok_or(RepositoryError::NotFound)?;
            Ok(chats.remove(pos))
        }

        async fn update_chat_visibility(
            &self,
            id: &Uuid,
            visibility: Visibility,
        ) -> Result<Chat, RepositoryError> {
            let mut chats = self.chats.lock().unwrap();
            let chat = chats
                .iter_mut()
                .find(|c| c.id == *id)
                .ok_or(RepositoryError::NotFound)?;
            chat.visibility = visibility;
            Ok(chat.clone())
        }

        async fn list_chats_by_user(
            &self,
            user_id: &Uuid,
            bound: Option<PageBound>,
            fetch_limit: u32,
        ) -> Result<Vec<Chat>, RepositoryError> {
            let mut chats: Vec<Chat> = self
                .chats
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.user_id == *user_id)
                .filter(|c| bound.is_none_or(|b| b.admits(c)))
                .cloned()
                .collect();

            chats.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            chats.truncate(fetch_limit as usize);
            Ok(chats)
        }

        async fn get_chat_created_at(
            &self,
            user_id: &Uuid,
            id: &Uuid,
        ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
            Ok(self
                .chats
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == *id && c.user_id == *user_id)
                .map(|c| c.created_at))
        }
    }

    /// Message store that resolves chat ownership through a shared chat store.
    #[derive(Clone)]
    pub struct MemoryMessageRepository {
        chats: MemoryChatRepository,
        messages: Arc<Mutex<Vec<ChatMessage>>>,
    }

    impl MemoryMessageRepository {
        pub fn new(chats: MemoryChatRepository) -> Self {
            Self {
                chats,
                messages: Arc::default(),
            }
        }
    }

    impl MessageRepository for MemoryMessageRepository {
        async fn save_messages(&self, messages: &[ChatMessage]) -> Result<(), RepositoryError> {
            self.messages.lock().unwrap().extend_from_slice(messages);
            Ok(())
        }

        async fn get_messages_by_chat_id(
            &self,
            chat_id: &Uuid,
        ) -> Result<Vec<ChatMessage>, RepositoryError> {
            let mut messages: Vec<ChatMessage> = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.chat_id == *chat_id)
                .cloned()
                .collect();
            messages.sort_by_key(|m| m.created_at);
            Ok(messages)
        }

        async fn get_message_by_id(
            &self,
            id: &Uuid,
        ) -> Result<Option<ChatMessage>, RepositoryError> {
            Ok(self
                .messages
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.id == *id)
                .cloned())
        }

        async fn delete_messages_by_chat_id_after_timestamp(
            &self,
            chat_id: &Uuid,
            timestamp: DateTime<Utc>,
        ) -> Result<Vec<ChatMessage>, RepositoryError> {
            let mut messages = self.messages.lock().unwrap();
            let (deleted, kept): (Vec<_>, Vec<_>) = messages
                .drain(..)
                .partition(|m| m.chat_id == *chat_id && m.created_at > timestamp);
            *messages = kept;
            Ok(deleted)
        }

        async fn count_user_messages_since(
            &self,
            user_id: &Uuid,
            since: DateTime<Utc>,
        ) -> Result<u32, RepositoryError> {
            let messages = self.messages.lock().unwrap().clone();
            let count = messages
                .iter()
                .filter(|m| m.role == MessageRole::User && m.created_at >= since)
                .filter(|m| self.chats.owner_of(&m.chat_id) == Some(*user_id))
                .count();
            Ok(count as u32)
        }
    }

    #[derive(Clone, Default)]
    pub struct MemoryVoteRepository {
        votes: Arc<Mutex<Vec<Vote>>>,
    }

    impl VoteRepository for MemoryVoteRepository {
        async fn upsert_vote(&self, vote: &Vote) -> Result<Vote, RepositoryError> {
            let mut votes = self.votes.lock().unwrap();
            votes.retain(|v| !(v.chat_id == vote.chat_id && v.message_id == vote.message_id));
            votes.push(vote.clone());
            Ok(vote.clone())
        }

        async fn get_votes_by_chat_id(&self, chat_id: &Uuid) -> Result<Vec<Vote>, RepositoryError> {
            Ok(self
                .votes
                .lock()
                .unwrap()
                .iter()
                .filter(|v| v.chat_id == *chat_id)
                .cloned()
                .collect())
        }
    }
}
