//! Users and their login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// A person (or anonymous guest) using the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn user_type(&self) -> UserType {
        if self.is_anonymous {
            UserType::Guest
        } else {
            UserType::Regular
        }
    }
}

/// Entitlement tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Guest,
    Regular,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Guest => write!(f, "guest"),
            UserType::Regular => write!(f, "regular"),
        }
    }
}

/// A login session. Only the SHA-256 hash of the bearer token is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(is_anonymous: bool) -> User {
        User {
            id: Uuid::now_v7(),
            email: None,
            is_anonymous,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_type() {
        assert_eq!(user(true).user_type(), UserType::Guest);
        assert_eq!(user(false).user_type(), UserType::Regular);
        assert_eq!(UserType::Guest.to_string(), "guest");
    }

    #[test]
    fn test_session_expiry_boundary() {
        let now = Utc::now();
        let session = AuthSession {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            token_hash: "abc".to_string(),
            created_at: now - Duration::hours(1),
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
