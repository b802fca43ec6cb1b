//! Infrastructure layer for Parley.
//!
//! Contains implementations of the ports defined in `parley-core`: the
//! SQLite store (chats, messages, votes, documents, sessions), session token
//! generation and hashing, configuration loading, and the streaming turn
//! transports.

pub mod config;
pub mod crypto;
pub mod sqlite;
pub mod turn;
