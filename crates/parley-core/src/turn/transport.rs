//! TurnTransport trait definition.
//!
//! `stream` returns a boxed stream rather than an RPITIT future so the trait
//! stays object-safe and a transport can be picked at runtime
//! (`Arc<dyn TurnTransport>`).

use std::pin::Pin;

use futures_util::Stream;
use parley_types::error::TurnError;
use parley_types::turn::{TurnChunk, TurnRequest};

/// Boxed chunk stream produced by a transport.
pub type TurnStream = Pin<Box<dyn Stream<Item = Result<TurnChunk, TurnError>> + Send + 'static>>;

/// Something that answers a chat turn with a stream of chunks.
///
/// Implementations live in parley-infra (`HttpTurnTransport`, `EchoTransport`).
/// Dropping the returned stream must abort the underlying work.
pub trait TurnTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Start a turn. Errors before the first chunk are yielded as the first item.
    fn stream(&self, request: TurnRequest) -> TurnStream;
}
