//! Client-side cache of loaded chat history pages.
//!
//! Pages are loaded newest first: the first page has no cursor, each later
//! page is requested `ending_before` the last chat of the previous one.
//! `invalidate` drops everything and bumps the generation so observers know
//! to refetch.

use parley_types::chat::Chat;
use parley_types::page::{ChatPage, PageRequest};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct HistoryCache {
    /// `(ending_before cursor, page)` in load order.
    pages: Vec<(Option<Uuid>, ChatPage)>,
    generation: u64,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every invalidation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, cursor: Option<Uuid>) -> Option<&ChatPage> {
        self.pages
            .iter()
            .find(|(key, _)| *key == cursor)
            .map(|(_, page)| page)
    }

    /// Store a page, replacing any earlier page loaded for the same cursor.
    pub fn insert(&mut self, cursor: Option<Uuid>, page: ChatPage) {
        match self.pages.iter_mut().find(|(key, _)| *key == cursor) {
            Some(slot) => slot.1 = page,
            None => self.pages.push((cursor, page)),
        }
    }

    /// The request for the next page, or `None` once history is exhausted.
    pub fn next_request(&self, page_size: u32) -> Option<PageRequest> {
        match self.pages.last() {
            None => Some(PageRequest::first(page_size)),
            Some((_, page)) if !page.has_more => None,
            Some((_, page)) => page
                .chats
                .last()
                .map(|chat| PageRequest::before(page_size, chat.id)),
        }
    }

    /// All cached chats, newest first.
    pub fn chats(&self) -> impl Iterator<Item = &Chat> {
        self.pages.iter().flat_map(|(_, page)| page.chats.iter())
    }

    pub fn invalidate(&mut self) {
        self.pages.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_types::chat::Visibility;

    fn page(n: usize, has_more: bool) -> ChatPage {
        let chats = (0..n)
            .map(|i| Chat {
                id: Uuid::now_v7(),
                title: format!("chat {i}"),
                user_id: Uuid::nil(),
                created_at: Utc::now(),
                visibility: Visibility::Private,
            })
            .collect();
        ChatPage { chats, has_more }
    }

    #[test]
    fn test_next_request_follows_last_page() {
        let mut cache = HistoryCache::new();
        assert_eq!(cache.next_request(2), Some(PageRequest::first(2)));

        let first = page(2, true);
        let last_id = first.chats[1].id;
        cache.insert(None, first);
        assert_eq!(cache.next_request(2), Some(PageRequest::before(2, last_id)));

        cache.insert(Some(last_id), page(1, false));
        assert_eq!(cache.next_request(2), None);
        assert_eq!(cache.chats().count(), 3);
    }

    #[test]
    fn test_insert_replaces_same_cursor() {
        let mut cache = HistoryCache::new();
        cache.insert(None, page(2, true));
        cache.insert(None, page(1, false));
        assert_eq!(cache.get(None).map(|p| p.chats.len()), Some(1));
    }

    #[test]
    fn test_invalidate_clears_and_bumps_generation() {
        let mut cache = HistoryCache::new();
        cache.insert(None, page(1, false));
        cache.invalidate();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), 1);
    }
}
