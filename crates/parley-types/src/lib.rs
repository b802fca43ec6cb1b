//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley chat
//! service: chats, messages, votes, documents, users, pagination and turn
//! lifecycle, plus their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod page;
pub mod turn;
pub mod user;
