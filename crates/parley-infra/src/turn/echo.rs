//! Local echo transport for development.

use std::time::Duration;

use parley_core::turn::transport::{TurnStream, TurnTransport};
use parley_types::chat::MessagePart;
use parley_types::error::TurnError;
use parley_types::turn::{FinishReason, TurnChunk, TurnRequest};

/// Streams the user's text back one word at a time.
#[derive(Debug, Clone)]
pub struct EchoTransport {
    delay: Duration,
}

impl EchoTransport {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for EchoTransport {
    fn default() -> Self {
        Self::with_delay(Duration::from_millis(20))
    }
}

impl TurnTransport for EchoTransport {
    fn name(&self) -> &str {
        "echo"
    }

    fn stream(&self, request: TurnRequest) -> TurnStream {
        let text = request
            .message
            .parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        let delay = self.delay;

        Box::pin(async_stream::stream! {
            for word in text.split_inclusive(char::is_whitespace) {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok::<_, TurnError>(TurnChunk::TextDelta { text_delta: word.to_string() });
            }
            yield Ok::<_, TurnError>(TurnChunk::Finish { finish_reason: FinishReason::Stop });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use parley_types::chat::MessageRole;
    use parley_types::turn::UiMessage;
    use uuid::Uuid;

    #[tokio::test]
    async fn echoes_words_then_finishes() {
        let request = TurnRequest {
            id: Uuid::now_v7(),
            message: UiMessage {
                id: Uuid::now_v7(),
                role: MessageRole::User,
                parts: vec![MessagePart::Text {
                    text: "hello big world".into(),
                }],
                attachments: Vec::new(),
                created_at: None,
            },
            selected_chat_model: "chat-model".into(),
        };

        let chunks: Vec<TurnChunk> = EchoTransport::with_delay(Duration::ZERO)
            .stream(request)
            .map(|c| c.unwrap())
            .collect()
            .await;

        let text: String = chunks
            .iter()
            .filter_map(|c| match c {
                TurnChunk::TextDelta { text_delta } => Some(text_delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "hello big world");
        assert_eq!(chunks.len(), 4);
        assert_eq!(
            chunks.last(),
            Some(&TurnChunk::Finish {
                finish_reason: FinishReason::Stop
            })
        );
    }
}
