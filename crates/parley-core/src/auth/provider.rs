//! AuthProvider trait definition.
//!
//! The auth provider owns identities and login sessions. Parley consumes it;
//! the infrastructure layer supplies a session-token implementation.

use parley_types::error::AuthError;
use parley_types::user::User;

/// A freshly created login session. `token` is the only copy of the
/// plaintext bearer token and must be handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: User,
    pub token: String,
}

/// Trait for authentication backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait AuthProvider: Send + Sync {
    /// Resolve the user behind a bearer token.
    ///
    /// Unknown, revoked and expired tokens all yield `Ok(None)`.
    fn get_user(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, AuthError>> + Send;

    /// Create an anonymous user together with a session for it.
    fn sign_in_anonymously(
        &self,
    ) -> impl std::future::Future<Output = Result<IssuedSession, AuthError>> + Send;

    /// Revoke the session behind a token. Revoking an unknown token is not an error.
    fn sign_out(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;
}
