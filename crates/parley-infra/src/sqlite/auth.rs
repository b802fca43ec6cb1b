//! SQLite-backed auth provider.
//!
//! Users and their login sessions live in the `users` / `auth_sessions`
//! tables. A session is looked up by the SHA-256 hash of its bearer token;
//! expired sessions resolve to no user and are removed lazily.

use chrono::{Duration, Utc};
use parley_core::auth::provider::{AuthProvider, IssuedSession};
use parley_types::error::{AuthError, RepositoryError};
use parley_types::user::User;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_failed};
use crate::crypto::token::{generate_token, hash_token};

/// Session-token auth provider over the Parley database.
#[derive(Clone)]
pub struct SqliteAuthProvider {
    pool: DatabasePool,
    session_ttl: Duration,
}

impl SqliteAuthProvider {
    pub fn new(pool: DatabasePool, session_ttl_hours: u32) -> Self {
        Self {
            pool,
            session_ttl: Duration::hours(i64::from(session_ttl_hours)),
        }
    }

    /// Remove every expired session. Returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= ?")
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(query_failed("purge_expired_sessions"))?;
        Ok(result.rows_affected())
    }

    /// Load a user by id, without any session.
    pub async fn find_user(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, is_anonymous, created_at FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_failed("find_user"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: String = row.try_get("id").map_err(query_failed("find_user"))?;
        let created_at: String = row.try_get("created_at").map_err(query_failed("find_user"))?;
        Ok(Some(User {
            id: parse_uuid(&id, "user id")?,
            email: row.try_get("email").map_err(query_failed("find_user"))?,
            is_anonymous: row
                .try_get("is_anonymous")
                .map_err(query_failed("find_user"))?,
            created_at: parse_datetime(&created_at)?,
        }))
    }
}

struct SessionUserRow {
    id: String,
    email: Option<String>,
    is_anonymous: bool,
    created_at: String,
    expires_at: String,
}

impl SessionUserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            is_anonymous: row.try_get("is_anonymous")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

impl AuthProvider for SqliteAuthProvider {
    async fn get_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        let token_hash = hash_token(token);
        let row = sqlx::query(
            "SELECT u.id, u.email, u.is_anonymous, u.created_at, s.expires_at
             FROM auth_sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_failed("get_user"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let row = SessionUserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;

        if parse_datetime(&row.expires_at)? <= Utc::now() {
            debug!("session expired, removing");
            sqlx::query("DELETE FROM auth_sessions WHERE token_hash = ?")
                .bind(&token_hash)
                .execute(&self.pool.writer)
                .await
                .map_err(query_failed("get_user"))?;
            return Ok(None);
        }

        Ok(Some(User {
            id: parse_uuid(&row.id, "user id")?,
            email: row.email,
            is_anonymous: row.is_anonymous,
            created_at: parse_datetime(&row.created_at)?,
        }))
    }

    async fn sign_in_anonymously(&self) -> Result<IssuedSession, AuthError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email: None,
            is_anonymous: true,
            created_at: parley_core::chat::truncate(now),
        };
        let token = generate_token();

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(query_failed("sign_in_anonymously"))?;

        sqlx::query("INSERT INTO users (id, email, is_anonymous, created_at) VALUES (?, NULL, 1, ?)")
            .bind(user.id.to_string())
            .bind(format_datetime(&user.created_at))
            .execute(&mut *tx)
            .await
            .map_err(query_failed("sign_in_anonymously"))?;

        sqlx::query(
            "INSERT INTO auth_sessions (id, user_id, token_hash, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user.id.to_string())
        .bind(hash_token(&token))
        .bind(format_datetime(&now))
        .bind(format_datetime(&(now + self.session_ttl)))
        .execute(&mut *tx)
        .await
        .map_err(query_failed("sign_in_anonymously"))?;

        tx.commit()
            .await
            .map_err(query_failed("sign_in_anonymously"))?;

        Ok(IssuedSession { user, token })
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM auth_sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(&self.pool.writer)
            .await
            .map_err(query_failed("sign_out"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::test_pool;
    use parley_core::auth::{GuestSignIn, guest_sign_in};
    use parley_types::user::UserType;

    #[tokio::test]
    async fn test_anonymous_session_round_trip() {
        let pool = test_pool().await;
        let provider = SqliteAuthProvider::new(pool, 24);

        let issued = provider.sign_in_anonymously().await.unwrap();
        assert!(issued.token.starts_with("prl_"));
        assert_eq!(issued.user.user_type(), UserType::Guest);

        let user = provider.get_user(&issued.token).await.unwrap().unwrap();
        assert_eq!(user, issued.user);

        provider.sign_out(&issued.token).await.unwrap();
        assert!(provider.get_user(&issued.token).await.unwrap().is_none());
        // Signing out twice is harmless.
        provider.sign_out(&issued.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_only_token_hash_is_stored() {
        let pool = test_pool().await;
        let provider = SqliteAuthProvider::new(pool.clone(), 24);
        let issued = provider.sign_in_anonymously().await.unwrap();

        let stored: String = sqlx::query_scalar("SELECT token_hash FROM auth_sessions")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        assert_ne!(stored, issued.token);
        assert_eq!(stored, hash_token(&issued.token));
    }

    #[tokio::test]
    async fn test_expired_session_resolves_to_none() {
        let pool = test_pool().await;
        let provider = SqliteAuthProvider::new(pool.clone(), 0);
        let issued = provider.sign_in_anonymously().await.unwrap();

        assert!(provider.get_user(&issued.token).await.unwrap().is_none());
        assert_eq!(provider.purge_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let pool = test_pool().await;
        let provider = SqliteAuthProvider::new(pool, 0);
        provider.sign_in_anonymously().await.unwrap();
        provider.sign_in_anonymously().await.unwrap();
        assert_eq!(provider.purge_expired_sessions().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_user_ignores_sessions() {
        let pool = test_pool().await;
        let provider = SqliteAuthProvider::new(pool, 24);
        let issued = provider.sign_in_anonymously().await.unwrap();
        provider.sign_out(&issued.token).await.unwrap();

        let found = provider.find_user(&issued.user.id).await.unwrap();
        assert_eq!(found, Some(issued.user));
        assert!(provider.find_user(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guest_flow_reuses_live_session() {
        let pool = test_pool().await;
        let provider = SqliteAuthProvider::new(pool, 24);

        let GuestSignIn::Created(issued) = guest_sign_in(&provider, None).await.unwrap() else {
            panic!("expected a new session");
        };
        let again = guest_sign_in(&provider, Some(&issued.token)).await.unwrap();
        assert!(matches!(again, GuestSignIn::AlreadySignedIn(user) if user.id == issued.user.id));

        let unknown = guest_sign_in(&provider, Some("prl_unknown")).await.unwrap();
        assert!(matches!(unknown, GuestSignIn::Created(_)));
    }
}
