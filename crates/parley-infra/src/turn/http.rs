//! HTTP turn transport over Server-Sent Events.
//!
//! The turn request is POSTed as JSON (`{id, message, selectedChatModel}`)
//! and the endpoint answers with an SSE stream whose `data:` payloads are
//! JSON chunks:
//!
//! ```text
//! data: {"type":"text-delta","textDelta":"Hel"}
//! data: {"type":"finish","finishReason":"stop"}
//! data: [DONE]
//! ```
//!
//! Payloads of other types are skipped; `{"type":"error","errorText":..}`
//! fails the stream.

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use parley_core::turn::transport::{TurnStream, TurnTransport};
use parley_types::error::TurnError;
use parley_types::turn::{TurnChunk, TurnRequest};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Streams turns from an external SSE endpoint.
///
/// The optional API key is sent as a bearer token and never logged.
pub struct HttpTurnTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpTurnTransport {
    pub fn new(
        endpoint: String,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, TurnError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TurnError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Envelope used to look at the `type` tag before committing to a chunk shape.
#[derive(Deserialize)]
struct RawChunk {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, rename = "errorText")]
    error_text: Option<String>,
}

/// Decode one SSE `data:` payload. `Ok(None)` means "skip this event".
fn parse_chunk(data: &str) -> Result<Option<TurnChunk>, TurnError> {
    let raw: RawChunk = serde_json::from_str(data)
        .map_err(|e| TurnError::Malformed(format!("{e}: {data}")))?;

    match raw.kind.as_str() {
        "text-delta" | "finish" => serde_json::from_str(data)
            .map(Some)
            .map_err(|e| TurnError::Malformed(format!("{e}: {data}"))),
        "error" => Err(TurnError::Stream(
            raw.error_text.unwrap_or_else(|| "turn endpoint reported an error".to_string()),
        )),
        _ => Ok(None),
    }
}

impl TurnTransport for HttpTurnTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn stream(&self, request: TurnRequest) -> TurnStream {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.as_ref().map(|k| k.expose_secret().to_string());

        Box::pin(async_stream::try_stream! {
            let mut builder = client
                .post(&endpoint)
                .header("Accept", "text/event-stream")
                .json(&request);
            if let Some(key) = api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TurnError::Transport(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            let response = if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = %status, body = %body, "turn endpoint rejected request");
                Err(TurnError::Rejected { status: status.as_u16(), body })?;
                unreachable!()
            } else {
                response
            };

            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| TurnError::Stream(e.to_string()))?;
                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break;
                }
                if let Some(chunk) = parse_chunk(data)? {
                    yield chunk;
                }
            }
        })
    }
}
