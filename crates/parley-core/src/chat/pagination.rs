//! Cursor-based chat history pagination.
//!
//! A page is computed in three steps:
//! 1. Validate the request (limit range, at most one cursor).
//! 2. Resolve the cursor id to its `created_at` with a point lookup scoped
//!    to the requesting user. An id that does not resolve is `CursorNotFound`.
//! 3. Over-fetch `limit + 1` rows on the requested side of the anchor and
//!    report `has_more` when the extra row came back.
//!
//! Ordering is `(created_at DESC, id DESC)`, a strict total order, so no chat
//! appears on two pages of a fixed snapshot. Inserts racing a page walk may
//! still produce a duplicate or gap; nothing here corrects for that.

use parley_types::error::ChatError;
use parley_types::page::{ChatPage, PageBound, PageCursor, PageRequest};
use tracing::error;
use uuid::Uuid;

use crate::repository::chat::ChatRepository;

/// List one page of `user_id`'s chats.
pub async fn list_chats<C: ChatRepository>(
    repo: &C,
    user_id: &Uuid,
    request: &PageRequest,
    max_limit: u32,
) -> Result<ChatPage, ChatError> {
    if request.limit == 0 || request.limit > max_limit {
        return Err(ChatError::InvalidPage(format!(
            "limit must be between 1 and {max_limit}, got {}",
            request.limit
        )));
    }

    let cursor = request.cursor().map_err(ChatError::InvalidPage)?;
    let bound = match cursor {
        Some(cursor) => Some(resolve_cursor(repo, user_id, cursor).await?),
        None => None,
    };

    let fetched = repo
        .list_chats_by_user(user_id, bound, request.limit.saturating_add(1))
        .await
        .map_err(|e| {
            error!(user_id = %user_id, error = %e, "Failed to get chats by user from database");
            e
        })?;

    Ok(ChatPage::from_overfetch(fetched, request.limit as usize))
}

async fn resolve_cursor<C: ChatRepository>(
    repo: &C,
    user_id: &Uuid,
    cursor: PageCursor,
) -> Result<PageBound, ChatError> {
    let id = cursor.anchor();
    let created_at = repo
        .get_chat_created_at(user_id, &id)
        .await?
        .ok_or(ChatError::CursorNotFound(id))?;

    Ok(match cursor {
        PageCursor::StartingAfter(_) => PageBound::After { created_at, id },
        PageCursor::EndingBefore(_) => PageBound::Before { created_at, id },
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chat::tests::MemoryChatRepository;
    use chrono::{TimeZone, Utc};
    use parley_types::chat::{Chat, Visibility};

    fn chat(user_id: Uuid, title: &str, secs: i64) -> Chat {
        Chat {
            id: Uuid::now_v7(),
            title: title.to_string(),
            user_id,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            visibility: Visibility::Private,
        }
    }

    /// A(t=3), B(t=2), C(t=1) for one user plus a chat owned by someone else.
    fn fixture() -> (MemoryChatRepository, Uuid, Chat, Chat, Chat, Chat) {
        let user = Uuid::now_v7();
        let other = Uuid::now_v7();
        let a = chat(user, "A", 3);
        let b = chat(user, "B", 2);
        let c = chat(user, "C", 1);
        let foreign = chat(other, "X", 5);
        let repo = MemoryChatRepository::with_chats(vec![
            c.clone(),
            a.clone(),
            foreign.clone(),
            b.clone(),
        ]);
        (repo, user, a, b, c, foreign)
    }

    fn titles(page: &ChatPage) -> Vec<&str> {
        page.chats.iter().map(|c| c.title.as_str()).collect()
    }

    #[tokio::test]
    async fn first_page_is_newest_first_with_has_more() {
        let (repo, user, ..) = fixture();
        let page = list_chats(&repo, &user, &PageRequest::first(2), 100)
            .await
            .unwrap();
        assert_eq!(titles(&page), ["A", "B"]);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn starting_after_returns_newer_chats() {
        let (repo, user, _, b, ..) = fixture();
        let page = list_chats(&repo, &user, &PageRequest::after(2, b.id), 100)
            .await
            .unwrap();
        assert_eq!(titles(&page), ["A"]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn ending_before_returns_older_chats() {
        let (repo, user, a, b, ..) = fixture();
        let page = list_chats(&repo, &user, &PageRequest::before(2, b.id), 100)
            .await
            .unwrap();
        assert_eq!(titles(&page), ["C"]);
        assert!(!page.has_more);

        let page = list_chats(&repo, &user, &PageRequest::before(1, a.id), 100)
            .await
            .unwrap();
        assert_eq!(titles(&page), ["B"]);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn exact_fit_has_no_more() {
        let (repo, user, ..) = fixture();
        let page = list_chats(&repo, &user, &PageRequest::first(3), 100)
            .await
            .unwrap();
        assert_eq!(page.chats.len(), 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn unknown_cursor_is_not_found() {
        let (repo, user, ..) = fixture();
        let missing = Uuid::now_v7();
        let err = list_chats(&repo, &user, &PageRequest::after(2, missing), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::CursorNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn foreign_cursor_is_not_found() {
        let (repo, user, _, _, _, foreign) = fixture();
        let err = list_chats(&repo, &user, &PageRequest::before(2, foreign.id), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::CursorNotFound(_)));
    }

    #[tokio::test]
    async fn invalid_limits_are_rejected() {
        let (repo, user, ..) = fixture();
        for limit in [0, 101] {
            let err = list_chats(&repo, &user, &PageRequest::first(limit), 100)
                .await
                .unwrap_err();
            assert!(matches!(err, ChatError::InvalidPage(_)));
        }
    }

    #[tokio::test]
    async fn both_cursors_are_rejected() {
        let (repo, user, a, b, ..) = fixture();
        let request = PageRequest {
            limit: 2,
            starting_after: Some(a.id),
            ending_before: Some(b.id),
        };
        let err = list_chats(&repo, &user, &request, 100).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidPage(_)));
    }

    #[tokio::test]
    async fn walking_backwards_visits_every_chat_once() {
        let user = Uuid::now_v7();
        let mut chats: Vec<Chat> = (0..7).map(|i| chat(user, &format!("{i}"), i)).collect();
        // Two chats sharing a timestamp must still both be visited.
        chats.push(chat(user, "tie", 3));
        let repo = MemoryChatRepository::with_chats(chats.clone());

        let mut seen = Vec::new();
        let mut request = PageRequest::first(3);
        loop {
            let page = list_chats(&repo, &user, &request, 100).await.unwrap();
            assert!(page.chats.len() <= 3);
            seen.extend(page.chats.iter().map(|c| c.id));
            match (page.has_more, page.chats.last()) {
                (true, Some(last)) => request = PageRequest::before(3, last.id),
                _ => break,
            }
        }

        let mut expected: Vec<Uuid> = chats.iter().map(|c| c.id).collect();
        expected.sort();
        seen.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn largest_limit_returns_everything_without_more() {
        let (repo, user, a, b, c, _) = fixture();
        let page = list_chats(&repo, &user, &PageRequest::first(u32::MAX), u32::MAX)
            .await
            .unwrap();
        assert_eq!(titles(&page), vec!["A", "B", "C"]);
        assert!(!page.has_more);
        let ids: Vec<Uuid> = page.chats.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }
}
