//! TurnTask: drive one chat turn on a background task.
//!
//! The task publishes its lifecycle through a `watch` channel and forwards
//! every chunk through an unbounded `mpsc` channel. Stopping the turn is a
//! matter of cancelling its `CancellationToken`: the transport stream is
//! dropped at the next poll and the state returns to `Idle`.
//!
//! ```text
//! Idle -> Submitting -> Streaming -> Idle
//!              \            \
//!               +-> Error    +-> Error
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parley_types::error::TurnError;
use parley_types::turn::{FinishReason, TurnChunk, TurnRequest, TurnState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::transport::TurnTransport;

/// How a turn ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The transport finished the stream.
    Completed {
        text: String,
        finish_reason: Option<FinishReason>,
    },
    /// The turn was stopped; `partial` holds the text received before that.
    Cancelled { partial: String },
}

impl TurnOutcome {
    /// Assistant text produced so far, complete or not.
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Completed { text, .. } => text,
            TurnOutcome::Cancelled { partial } => partial,
        }
    }
}

/// Builder for a turn. Call [`TurnTask::spawn`] to start it.
pub struct TurnTask {
    transport: Arc<dyn TurnTransport>,
    request: TurnRequest,
    timeout: Option<Duration>,
    cancellation: CancellationToken,
}

impl TurnTask {
    pub fn new(transport: Arc<dyn TurnTransport>, request: TurnRequest) -> Self {
        Self {
            transport,
            request,
            timeout: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Fail the turn with a transport error if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use an externally owned token (e.g. one handed out by a `TurnRegistry`).
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Start the turn on the current tokio runtime.
    pub fn spawn(self) -> TurnHandle {
        let turn_id = Uuid::now_v7();
        let (state_tx, state_rx) = watch::channel(TurnState::Submitting);
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let cancel = self.cancellation.clone();

        let join = tokio::spawn(run_turn(
            turn_id,
            self.transport,
            self.request,
            self.timeout,
            self.cancellation,
            state_tx,
            chunk_tx,
        ));

        TurnHandle {
            id: turn_id,
            state: state_rx,
            chunks: Some(chunk_rx),
            cancel,
            join,
        }
    }
}

/// Handle to a running turn.
pub struct TurnHandle {
    id: Uuid,
    state: watch::Receiver<TurnState>,
    chunks: Option<mpsc::UnboundedReceiver<TurnChunk>>,
    cancel: CancellationToken,
    join: JoinHandle<Result<TurnOutcome, TurnError>>,
}

impl TurnHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subscribe to state changes.
    pub fn state(&self) -> watch::Receiver<TurnState> {
        self.state.clone()
    }

    /// Take the chunk receiver. Only the first call returns `Some`.
    pub fn chunks(&mut self) -> Option<mpsc::UnboundedReceiver<TurnChunk>> {
        self.chunks.take()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the turn to end.
    pub async fn join(self) -> Result<TurnOutcome, TurnError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(TurnError::Stream(format!("turn task aborted: {e}"))),
        }
    }
}

async fn run_turn(
    turn_id: Uuid,
    transport: Arc<dyn TurnTransport>,
    request: TurnRequest,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    state: watch::Sender<TurnState>,
    chunks: mpsc::UnboundedSender<TurnChunk>,
) -> Result<TurnOutcome, TurnError> {
    let chat_id = request.id;
    debug!(turn_id = %turn_id, chat_id = %chat_id, transport = transport.name(), "turn submitted");

    // Without a timeout the deadline branch is disabled and never polled.
    let deadline = tokio::time::sleep(timeout.unwrap_or(Duration::from_secs(3600)));
    tokio::pin!(deadline);

    let mut stream = transport.stream(request);
    let mut text = String::new();
    let mut finish_reason = None;
    let mut streaming = false;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(turn_id = %turn_id, chat_id = %chat_id, "turn cancelled");
                drop(stream);
                state.send_replace(TurnState::Idle);
                return Ok(TurnOutcome::Cancelled { partial: text });
            }

            _ = &mut deadline, if timeout.is_some() => {
                warn!(turn_id = %turn_id, chat_id = %chat_id, "turn timed out");
                let err = TurnError::Transport("turn timed out".to_string());
                state.send_replace(TurnState::Error { message: err.to_string() });
                return Err(err);
            }

            next = stream.next() => match next {
                Some(Ok(chunk)) => {
                    if !streaming {
                        streaming = true;
                        state.send_replace(TurnState::Streaming);
                    }
                    match &chunk {
                        TurnChunk::TextDelta { text_delta } => text.push_str(text_delta),
                        TurnChunk::Finish { finish_reason: reason } => finish_reason = Some(*reason),
                    }
                    // A dropped receiver only means nobody is listening.
                    let _ = chunks.send(chunk);
                }
                Some(Err(e)) => {
                    warn!(turn_id = %turn_id, chat_id = %chat_id, error = %e, "turn failed");
                    state.send_replace(TurnState::Error { message: e.to_string() });
                    return Err(e);
                }
                None => {
                    debug!(turn_id = %turn_id, chat_id = %chat_id, chars = text.len(), "turn finished");
                    state.send_replace(TurnState::Idle);
                    return Ok(TurnOutcome::Completed { text, finish_reason });
                }
            }
        }
    }
}
