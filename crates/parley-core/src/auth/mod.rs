//! Session/user resolution on top of the [`AuthProvider`] port.

pub mod provider;

use parley_types::error::AuthError;
use parley_types::user::User;
use tracing::{debug, info};

use self::provider::{AuthProvider, IssuedSession};

/// Result of the guest sign-in flow.
#[derive(Debug, Clone)]
pub enum GuestSignIn {
    /// The caller already has a live session; nothing was created.
    AlreadySignedIn(User),
    /// A new anonymous user and session were issued.
    Created(IssuedSession),
}

/// Resolve the current caller. No token, or a token the provider does not
/// recognise, is `Ok(None)` so callers can redirect to guest sign-in.
pub async fn get_user<A: AuthProvider>(
    provider: &A,
    token: Option<&str>,
) -> Result<Option<User>, AuthError> {
    match token {
        Some(token) if !token.is_empty() => provider.get_user(token).await,
        _ => Ok(None),
    }
}

/// Reuse the caller's session if it is live, otherwise sign in anonymously.
pub async fn guest_sign_in<A: AuthProvider>(
    provider: &A,
    token: Option<&str>,
) -> Result<GuestSignIn, AuthError> {
    if let Some(user) = get_user(provider, token).await? {
        debug!(user_id = %user.id, "Guest sign-in skipped, session already active");
        return Ok(GuestSignIn::AlreadySignedIn(user));
    }

    let issued = provider.sign_in_anonymously().await?;
    info!(user_id = %issued.user.id, "Anonymous session created");
    Ok(GuestSignIn::Created(issued))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// In-memory provider keyed by plaintext token.
    #[derive(Default)]
    pub(crate) struct FakeAuthProvider {
        pub sessions: Mutex<Vec<(String, User)>>,
    }

    impl AuthProvider for FakeAuthProvider {
        async fn get_user(&self, token: &str) -> Result<Option<User>, AuthError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions
                .iter()
                .find(|(t, _)| t == token)
                .map(|(_, u)| u.clone()))
        }

        async fn sign_in_anonymously(&self) -> Result<IssuedSession, AuthError> {
            let user = User {
                id: Uuid::now_v7(),
                email: None,
                is_anonymous: true,
                created_at: Utc::now(),
            };
            let token = format!("tok-{}", user.id);
            self.sessions
                .lock()
                .unwrap()
                .push((token.clone(), user.clone()));
            Ok(IssuedSession { user, token })
        }

        async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
            self.sessions.lock().unwrap().retain(|(t, _)| t != token);
            Ok(())
        }
    }

    #[tokio::test]
    async fn get_user_without_token_is_absent() {
        let provider = FakeAuthProvider::default();
        assert!(get_user(&provider, None).await.unwrap().is_none());
        assert!(get_user(&provider, Some("")).await.unwrap().is_none());
        assert!(get_user(&provider, Some("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn guest_sign_in_creates_session_when_absent() {
        let provider = FakeAuthProvider::default();
        let outcome = guest_sign_in(&provider, None).await.unwrap();
        let GuestSignIn::Created(issued) = outcome else {
            panic!("expected a new session");
        };
        assert!(issued.user.is_anonymous);

        let resolved = get_user(&provider, Some(&issued.token)).await.unwrap();
        assert_eq!(resolved.unwrap().id, issued.user.id);
    }

    #[tokio::test]
    async fn guest_sign_in_reuses_live_session() {
        let provider = FakeAuthProvider::default();
        let issued = provider.sign_in_anonymously().await.unwrap();

        let outcome = guest_sign_in(&provider, Some(&issued.token)).await.unwrap();
        assert!(matches!(outcome, GuestSignIn::AlreadySignedIn(u) if u.id == issued.user.id));
        assert_eq!(provider.sessions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sign_out_revokes_token() {
        let provider = FakeAuthProvider::default();
        let issued = provider.sign_in_anonymously().await.unwrap();
        provider.sign_out(&issued.token).await.unwrap();
        assert!(get_user(&provider, Some(&issued.token)).await.unwrap().is_none());
    }
}
