//! Cryptographic helpers: session token generation and hashing.

pub mod token;
