//! Chat title derivation.
//!
//! A new chat is titled from the text of its first user message: whitespace
//! collapsed, surrounding quotes trimmed, cut to [`MAX_TITLE_CHARS`] characters.

use parley_types::chat::ChatMessage;

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 80;

/// Title used when the first message has no text (e.g. attachments only).
pub const FALLBACK_TITLE: &str = "New chat";

/// Derive a chat title from the first user message.
pub fn derive_title(message: &ChatMessage) -> String {
    title_from_text(&message.text())
}

fn title_from_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches('"').trim_matches('\'').trim();

    if trimmed.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_string();
    }

    let cut: String = trimmed.chars().take(MAX_TITLE_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}
