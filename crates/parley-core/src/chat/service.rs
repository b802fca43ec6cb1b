//! Chat service: ownership rules, history pagination, message persistence,
//! votes and the daily message allowance.
//!
//! ChatService is generic over the three chat-side repositories so that
//! parley-core never depends on parley-infra.

use chrono::{DateTime, Duration};
use parley_types::chat::{Chat, ChatMessage, Visibility, Vote, VoteType};
use parley_types::config::Entitlements;
use parley_types::error::ChatError;
use parley_types::page::{ChatPage, PageRequest};
use parley_types::user::User;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chat::{now, pagination, title};
use crate::repository::chat::ChatRepository;
use crate::repository::message::MessageRepository;
use crate::repository::vote::VoteRepository;

/// Window the daily message allowance is counted over.
pub const RATE_LIMIT_WINDOW_HOURS: i64 = 24;

/// How a viewer may interact with a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAccess {
    /// The viewer owns the chat.
    Owner,
    /// Someone else's public chat: visible, but no turns or edits.
    ReadOnly,
}

impl ChatAccess {
    pub fn is_readonly(self) -> bool {
        self == ChatAccess::ReadOnly
    }
}

/// Decide how `viewer` may access `chat`.
///
/// Private chats are visible to their owner only.
pub fn access_for(chat: &Chat, viewer: Option<&Uuid>) -> Result<ChatAccess, ChatError> {
    match (viewer, chat.visibility) {
        (Some(viewer), _) if *viewer == chat.user_id => Ok(ChatAccess::Owner),
        (_, Visibility::Public) => Ok(ChatAccess::ReadOnly),
        (_, Visibility::Private) => Err(ChatError::Forbidden),
    }
}

/// Orchestrates chats, their messages and their votes.
pub struct ChatService<C: ChatRepository, M: MessageRepository, V: VoteRepository> {
    chat_repo: C,
    message_repo: M,
    vote_repo: V,
    max_page_limit: u32,
    entitlements: Entitlements,
}

impl<C: ChatRepository, M: MessageRepository, V: VoteRepository> ChatService<C, M, V> {
    pub fn new(
        chat_repo: C,
        message_repo: M,
        vote_repo: V,
        max_page_limit: u32,
        entitlements: Entitlements,
    ) -> Self {
        Self {
            chat_repo,
            message_repo,
            vote_repo,
            max_page_limit,
            entitlements,
        }
    }

    pub fn chat_repo(&self) -> &C {
        &self.chat_repo
    }

    pub fn message_repo(&self) -> &M {
        &self.message_repo
    }

    // --- Chats ---

    /// One page of the user's chat history, newest first.
    pub async fn list_chats(
        &self,
        user_id: &Uuid,
        request: &PageRequest,
    ) -> Result<ChatPage, ChatError> {
        pagination::list_chats(&self.chat_repo, user_id, request, self.max_page_limit).await
    }

    pub async fn get_chat(&self, id: &Uuid) -> Result<Option<Chat>, ChatError> {
        Ok(self.chat_repo.get_chat_by_id(id).await?)
    }

    /// Load a chat and check that `viewer` may see it.
    pub async fn get_chat_for_viewer(
        &self,
        id: &Uuid,
        viewer: Option<&Uuid>,
    ) -> Result<(Chat, ChatAccess), ChatError> {
        let chat = self
            .chat_repo
            .get_chat_by_id(id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;
        let access = access_for(&chat, viewer)?;
        Ok((chat, access))
    }

    /// Create a chat owned by `user_id`.
    pub async fn save_chat(
        &self,
        id: Uuid,
        user_id: Uuid,
        title: String,
        visibility: Visibility,
    ) -> Result<Chat, ChatError> {
        let chat = Chat {
            id,
            title,
            user_id,
            created_at: now(),
            visibility,
        };
        self.chat_repo.save_chat(&chat).await.map_err(|e| {
            error!(chat_id = %id, error = %e, "Failed to save chat in database");
            ChatError::from(e)
        })
    }

    /// Find the chat a turn belongs to, creating it on the first message.
    ///
    /// A new chat is titled from `first_message`. An existing chat must be
    /// owned by `user_id`.
    pub async fn ensure_chat_for_turn(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        first_message: &ChatMessage,
        visibility: Visibility,
    ) -> Result<Chat, ChatError> {
        match self.chat_repo.get_chat_by_id(&chat_id).await? {
            Some(chat) if chat.user_id == user_id => Ok(chat),
            Some(_) => Err(ChatError::Forbidden),
            None => {
                let title = title::derive_title(first_message);
                debug!(chat_id = %chat_id, title = %title, "creating chat for first turn");
                self.save_chat(chat_id, user_id, title, visibility).await
            }
        }
    }

    /// Delete a chat owned by `user_id`.
    pub async fn delete_chat(&self, id: &Uuid, user_id: &Uuid) -> Result<Chat, ChatError> {
        self.require_owned(id, user_id).await?;
        let chat = self.chat_repo.delete_chat_by_id(id).await?;
        info!(chat_id = %id, "deleted chat");
        Ok(chat)
    }

    pub async fn update_visibility(
        &self,
        id: &Uuid,
        user_id: &Uuid,
        visibility: Visibility,
    ) -> Result<Chat, ChatError> {
        self.require_owned(id, user_id).await?;
        Ok(self.chat_repo.update_chat_visibility(id, visibility).await?)
    }

    async fn require_owned(&self, id: &Uuid, user_id: &Uuid) -> Result<Chat, ChatError> {
        let chat = self
            .chat_repo
            .get_chat_by_id(id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;
        if chat.user_id != *user_id {
            warn!(chat_id = %id, user_id = %user_id, "rejected access to foreign chat");
            return Err(ChatError::Forbidden);
        }
        Ok(chat)
    }

    // --- Messages ---

    /// Persist a batch of messages. Timestamps are normalized to storage precision.
    pub async fn save_messages(&self, messages: Vec<ChatMessage>) -> Result<(), ChatError> {
        if messages.is_empty() {
            return Ok(());
        }
        let messages: Vec<ChatMessage> = messages
            .into_iter()
            .map(|mut m| {
                m.created_at = crate::chat::truncate(m.created_at);
                m
            })
            .collect();
        self.message_repo.save_messages(&messages).await.map_err(|e| {
            error!(count = messages.len(), error = %e, "Failed to save messages in database");
            ChatError::from(e)
        })
    }

    pub async fn get_messages_by_chat_id(
        &self,
        chat_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.message_repo.get_messages_by_chat_id(chat_id).await?)
    }

    pub async fn get_message_by_id(&self, id: &Uuid) -> Result<Option<ChatMessage>, ChatError> {
        Ok(self.message_repo.get_message_by_id(id).await?)
    }

    /// Delete the owner's messages in `chat_id` created strictly after `timestamp`.
    pub async fn delete_messages_after(
        &self,
        chat_id: &Uuid,
        user_id: &Uuid,
        timestamp: DateTime<chrono::Utc>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.require_owned(chat_id, user_id).await?;
        let deleted = self
            .message_repo
            .delete_messages_by_chat_id_after_timestamp(chat_id, timestamp)
            .await?;
        debug!(chat_id = %chat_id, count = deleted.len(), "deleted trailing messages");
        Ok(deleted)
    }

    /// Drop every message after `message_id` in its chat, keeping the message itself.
    pub async fn delete_trailing_messages(
        &self,
        message_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let message = self
            .message_repo
            .get_message_by_id(message_id)
            .await?
            .ok_or(ChatError::NotFound("message"))?;
        self.delete_messages_after(&message.chat_id, user_id, message.created_at)
            .await
    }

    // --- Allowance ---

    /// User-role messages the user sent in the last `hours` hours.
    pub async fn get_message_count_by_user_id(
        &self,
        user_id: &Uuid,
        hours: i64,
    ) -> Result<u32, ChatError> {
        let since = now() - Duration::hours(hours);
        self.message_repo
            .count_user_messages_since(user_id, since)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Failed to get message count by user id");
                ChatError::from(e)
            })
    }

    /// Reject the turn when the user has used up the daily allowance.
    pub async fn check_rate_limit(&self, user: &User) -> Result<(), ChatError> {
        let limit = self
            .entitlements
            .for_user_type(user.user_type())
            .max_messages_per_day;
        let count = self
            .get_message_count_by_user_id(&user.id, RATE_LIMIT_WINDOW_HOURS)
            .await?;
        if count >= limit {
            warn!(user_id = %user.id, count, limit, "daily message limit reached");
            return Err(ChatError::RateLimited { limit });
        }
        Ok(())
    }

    // --- Votes ---

    /// Record the owner's vote on a message. Re-voting replaces the earlier vote.
    pub async fn vote_message(
        &self,
        chat_id: &Uuid,
        message_id: &Uuid,
        user_id: &Uuid,
        vote_type: VoteType,
    ) -> Result<Vote, ChatError> {
        self.require_owned(chat_id, user_id).await?;
        match self.message_repo.get_message_by_id(message_id).await? {
            Some(message) if message.chat_id == *chat_id => {}
            _ => return Err(ChatError::NotFound("message")),
        }
        let vote = Vote::new(*chat_id, *message_id, vote_type);
        Ok(self.vote_repo.upsert_vote(&vote).await?)
    }

    /// Votes in a chat, visible to the owner only.
    pub async fn get_votes_by_chat_id(
        &self,
        chat_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Vec<Vote>, ChatError> {
        self.require_owned(chat_id, user_id).await?;
        Ok(self.vote_repo.get_votes_by_chat_id(chat_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::tests::{
        MemoryChatRepository, MemoryMessageRepository, MemoryVoteRepository, text_message,
    };
    use chrono::Utc;
    use parley_types::chat::MessageRole;

    type Service = ChatService<MemoryChatRepository, MemoryMessageRepository, MemoryVoteRepository>;

    fn service() -> Service {
        let chats = MemoryChatRepository::default();
        let messages = MemoryMessageRepository::new(chats.clone());
        ChatService::new(
            chats,
            messages,
            MemoryVoteRepository::default(),
            100,
            Entitlements::default(),
        )
    }

    fn user(is_anonymous: bool) -> User {
        User {
            id: Uuid::now_v7(),
            email: (!is_anonymous).then(|| "someone@example.com".to_string()),
            is_anonymous,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_first_turn_creates_titled_chat() {
        let service = service();
        let owner = Uuid::now_v7();
        let chat_id = Uuid::now_v7();
        let message = text_message(chat_id, MessageRole::User, "  What is   borrowing? ");

        let chat = service
            .ensure_chat_for_turn(chat_id, owner, &message, Visibility::Private)
            .await
            .unwrap();
        assert_eq!(chat.title, "What is borrowing?");
        assert_eq!(chat.user_id, owner);

        // Second turn reuses the chat.
        let again = service
            .ensure_chat_for_turn(chat_id, owner, &message, Visibility::Public)
            .await
            .unwrap();
        assert_eq!(again.visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn test_turn_on_foreign_chat_is_forbidden() {
        let service = service();
        let chat = service
            .save_chat(Uuid::now_v7(), Uuid::now_v7(), "mine".into(), Visibility::Public)
            .await
            .unwrap();
        let message = text_message(chat.id, MessageRole::User, "hi");
        let err = service
            .ensure_chat_for_turn(chat.id, Uuid::now_v7(), &message, Visibility::Private)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Forbidden));
    }

    #[tokio::test]
    async fn test_viewer_access_rules() {
        let service = service();
        let owner = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let chat = service
            .save_chat(Uuid::now_v7(), owner, "t".into(), Visibility::Private)
            .await
            .unwrap();

        let (_, access) = service.get_chat_for_viewer(&chat.id, Some(&owner)).await.unwrap();
        assert_eq!(access, ChatAccess::Owner);
        assert!(matches!(
            service.get_chat_for_viewer(&chat.id, Some(&stranger)).await,
            Err(ChatError::Forbidden)
        ));

        service
            .update_visibility(&chat.id, &owner, Visibility::Public)
            .await
            .unwrap();
        let (_, access) = service.get_chat_for_viewer(&chat.id, None).await.unwrap();
        assert!(access.is_readonly());
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let service = service();
        let owner = Uuid::now_v7();
        let chat = service
            .save_chat(Uuid::now_v7(), owner, "t".into(), Visibility::Private)
            .await
            .unwrap();

        assert!(matches!(
            service.delete_chat(&chat.id, &Uuid::now_v7()).await,
            Err(ChatError::Forbidden)
        ));
        let deleted = service.delete_chat(&chat.id, &owner).await.unwrap();
        assert_eq!(deleted.id, chat.id);
        assert!(service.get_chat(&chat.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete_chat(&chat.id, &owner).await,
            Err(ChatError::NotFound("chat"))
        ));
    }

    #[tokio::test]
    async fn test_delete_trailing_keeps_anchor_message() {
        let service = service();
        let owner = Uuid::now_v7();
        let chat = service
            .save_chat(Uuid::now_v7(), owner, "t".into(), Visibility::Private)
            .await
            .unwrap();

        let base = now();
        let mut messages = Vec::new();
        for (i, text) in ["one", "two", "three"].iter().enumerate() {
            let mut m = text_message(chat.id, MessageRole::User, text);
            m.created_at = base + Duration::seconds(i as i64);
            messages.push(m);
        }
        service.save_messages(messages.clone()).await.unwrap();

        let deleted = service
            .delete_trailing_messages(&messages[1].id, &owner)
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].id, messages[2].id);

        let remaining = service.get_messages_by_chat_id(&chat.id).await.unwrap();
        let texts: Vec<String> = remaining.iter().map(|m| m.text()).collect();
        assert_eq!(texts, ["one", "two"]);
    }

    #[tokio::test]
    async fn test_rate_limit_counts_user_messages_only() {
        let service = service();
        let guest = user(true);
        let chat = service
            .save_chat(Uuid::now_v7(), guest.id, "t".into(), Visibility::Private)
            .await
            .unwrap();

        let mut batch = Vec::new();
        for _ in 0..19 {
            batch.push(text_message(chat.id, MessageRole::User, "q"));
            batch.push(text_message(chat.id, MessageRole::Assistant, "a"));
        }
        service.save_messages(batch).await.unwrap();
        service.check_rate_limit(&guest).await.unwrap();

        service
            .save_messages(vec![text_message(chat.id, MessageRole::User, "q")])
            .await
            .unwrap();
        let err = service.check_rate_limit(&guest).await.unwrap_err();
        assert!(matches!(err, ChatError::RateLimited { limit: 20 }));
    }

    #[tokio::test]
    async fn test_votes_last_write_wins() {
        let service = service();
        let owner = Uuid::now_v7();
        let chat = service
            .save_chat(Uuid::now_v7(), owner, "t".into(), Visibility::Private)
            .await
            .unwrap();
        let reply = text_message(chat.id, MessageRole::Assistant, "answer");
        service.save_messages(vec![reply.clone()]).await.unwrap();

        service
            .vote_message(&chat.id, &reply.id, &owner, VoteType::Up)
            .await
            .unwrap();
        service
            .vote_message(&chat.id, &reply.id, &owner, VoteType::Down)
            .await
            .unwrap();

        let votes = service.get_votes_by_chat_id(&chat.id, &owner).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert!(!votes[0].is_upvoted);

        let err = service
            .vote_message(&chat.id, &Uuid::now_v7(), &owner, VoteType::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound("message")));
    }
}
