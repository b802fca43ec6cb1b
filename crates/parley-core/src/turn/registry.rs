//! In-flight turn registry.
//!
//! At most one turn runs per chat. Starting a turn takes a [`TurnLease`]; the
//! lease holds the turn's cancellation token and releases the chat slot when
//! dropped. `cancel` lets another request (the stop endpoint) reach the token.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parley_types::error::TurnError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

struct ActiveTurn {
    lease_id: Uuid,
    token: CancellationToken,
}

/// Tracks cancellation tokens of running turns keyed by chat id.
#[derive(Clone, Default)]
pub struct TurnRegistry {
    active: Arc<DashMap<Uuid, ActiveTurn>>,
}

impl TurnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the turn slot for `chat_id`.
    ///
    /// Fails with `TurnError::Busy` while another uncancelled turn holds it.
    pub fn begin(&self, chat_id: Uuid) -> Result<TurnLease, TurnError> {
        let lease_id = Uuid::now_v7();
        let token = CancellationToken::new();
        let entry = ActiveTurn {
            lease_id,
            token: token.clone(),
        };

        match self.active.entry(chat_id) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().token.is_cancelled() {
                    return Err(TurnError::Busy);
                }
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }

        debug!(chat_id = %chat_id, "turn slot claimed");
        Ok(TurnLease {
            active: Arc::clone(&self.active),
            chat_id,
            lease_id,
            token,
        })
    }

    /// Cancel the running turn of `chat_id`. Returns whether one was running.
    pub fn cancel(&self, chat_id: &Uuid) -> bool {
        match self.active.get(chat_id) {
            Some(turn) if !turn.token.is_cancelled() => {
                turn.token.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, chat_id: &Uuid) -> bool {
        self.active
            .get(chat_id)
            .is_some_and(|turn| !turn.token.is_cancelled())
    }

    /// Number of chats with a turn slot held.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Cancel every running turn (used on shutdown).
    pub fn cancel_all(&self) {
        for turn in self.active.iter() {
            turn.token.cancel();
        }
    }
}

/// Ownership of one chat's turn slot. Dropping it frees the slot.
pub struct TurnLease {
    active: Arc<DashMap<Uuid, ActiveTurn>>,
    chat_id: Uuid,
    lease_id: Uuid,
    token: CancellationToken,
}

impl TurnLease {
    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for TurnLease {
    fn drop(&mut self) {
        // A cancelled lease may already have been replaced by a newer turn.
        self.active
            .remove_if(&self.chat_id, |_, turn| turn.lease_id == self.lease_id);
    }
}
