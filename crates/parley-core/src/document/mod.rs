//! Versioned artifact documents and their edit suggestions.

pub mod service;
