//! HTTP request handlers.

pub mod auth;
pub mod chat;
pub mod document;
pub mod history;
pub mod page;
pub mod suggestion;
pub mod vote;
