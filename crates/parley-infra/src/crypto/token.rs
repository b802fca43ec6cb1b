//! Session bearer tokens.
//!
//! A token is 32 random bytes from the OS RNG, hex-encoded and prefixed with
//! `prl_`. Only its SHA-256 digest (lowercase hex) is ever stored.

use aes_gcm::aead::{OsRng, rand_core::RngCore};
use sha2::{Digest, Sha256};

pub const TOKEN_PREFIX: &str = "prl_";

/// Generate a new plaintext session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!(
        "{TOKEN_PREFIX}{}",
        bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    )
}

/// SHA-256 of a token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}
