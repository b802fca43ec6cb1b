//! Chat turns: one request streamed to a transport, observed and cancellable.
//!
//! - [`transport::TurnTransport`] is the seam to whatever produces the reply.
//! - [`task::TurnTask`] drives one turn on a tokio task and publishes its
//!   [`TurnState`](parley_types::turn::TurnState) through a `watch` channel.
//! - [`registry::TurnRegistry`] tracks in-flight turns per chat so they can
//!   be stopped from another request.

pub mod registry;
pub mod task;
pub mod transport;
