//! Chat, message and vote types for Parley.
//!
//! A chat belongs to a single user and holds an ordered list of messages.
//! Messages carry structured content parts and file attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who can read a chat.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (visibility IN ('private', 'public'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::Public => write!(f, "public"),
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(format!("invalid visibility: '{other}'")),
        }
    }
}

/// Role of a message author within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A conversation owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub title: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub visibility: Visibility,
}

/// One structured piece of message content.
///
/// Serialized with a `type` tag in kebab-case (`text`, `reasoning`,
/// `tool-invocation`, `step-start`), the shape the web client produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        reasoning: String,
    },
    ToolInvocation {
        #[serde(rename = "toolInvocation")]
        tool_invocation: serde_json::Value,
    },
    StepStart,
}

/// A file attached to a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// A single message within a chat.
///
/// Messages are ordered by `created_at` within a chat and never edited in
/// place; "edit and regenerate" deletes every message after a cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Concatenated text of all `text` parts, separated by newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Up or down, as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

/// A user's rating of one assistant message. At most one per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub is_upvoted: bool,
}

impl Vote {
    pub fn new(chat_id: Uuid, message_id: Uuid, vote: VoteType) -> Self {
        Self {
            chat_id,
            message_id,
            is_upvoted: vote == VoteType::Up,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_roundtrip() {
        for visibility in [Visibility::Private, Visibility::Public] {
            let parsed: Visibility = visibility.to_string().parse().unwrap();
            assert_eq!(visibility, parsed);
        }
        assert!("secret".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_visibility_default_is_private() {
        assert_eq!(Visibility::default(), Visibility::Private);
    }

    #[test]
    fn test_message_role_parse_is_case_insensitive() {
        assert_eq!("Assistant".parse::<MessageRole>().unwrap(), MessageRole::Assistant);
        assert!("tool".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_message_part_wire_format() {
        let json = r#"[{"type":"step-start"},{"type":"text","text":"hi"}]"#;
        let parts: Vec<MessagePart> = serde_json::from_str(json).unwrap();
        assert_eq!(parts[0], MessagePart::StepStart);
        assert_eq!(
            parts[1],
            MessagePart::Text {
                text: "hi".to_string()
            }
        );

        let tool = MessagePart::ToolInvocation {
            tool_invocation: serde_json::json!({"toolName": "getWeather"}),
        };
        let out = serde_json::to_string(&tool).unwrap();
        assert!(out.contains("\"type\":\"tool-invocation\""));
        assert!(out.contains("\"toolInvocation\""));
    }

    #[test]
    fn test_message_text_joins_text_parts_only() {
        let message = ChatMessage {
            id: Uuid::now_v7(),
            chat_id: Uuid::now_v7(),
            role: MessageRole::User,
            parts: vec![
                MessagePart::Text {
                    text: "first".to_string(),
                },
                MessagePart::Reasoning {
                    reasoning: "hidden".to_string(),
                },
                MessagePart::Text {
                    text: "second".to_string(),
                },
            ],
            attachments: Vec::new(),
            created_at: Utc::now(),
        };
        assert_eq!(message.text(), "first\nsecond");
    }

    #[test]
    fn test_attachment_uses_content_type_key() {
        let attachment = Attachment {
            url: "https://files.example/a.png".to_string(),
            name: "a.png".to_string(),
            content_type: "image/png".to_string(),
        };
        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("\"contentType\":\"image/png\""));
    }

    #[test]
    fn test_vote_from_type() {
        let chat_id = Uuid::now_v7();
        let message_id = Uuid::now_v7();
        assert!(Vote::new(chat_id, message_id, VoteType::Up).is_upvoted);
        assert!(!Vote::new(chat_id, message_id, VoteType::Down).is_upvoted);
    }
}
