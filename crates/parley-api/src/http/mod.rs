//! HTTP API layer for Parley.
//!
//! Axum-based JSON + SSE API with session-cookie authentication, envelope
//! response format, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
