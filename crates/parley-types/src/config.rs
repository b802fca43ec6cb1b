//! Process-wide configuration types for Parley.
//!
//! `AppConfig` represents `config.toml` in the data directory. It is loaded
//! once at startup and shared read-only.

use serde::{Deserialize, Serialize};

use crate::user::UserType;

/// Top-level configuration. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model used when the `chat-model` cookie is absent.
    #[serde(default = "default_chat_model")]
    pub default_chat_model: String,

    /// Largest page the history listing will serve.
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u32,

    /// Lifetime of a login session in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,

    #[serde(default)]
    pub entitlements: Entitlements,

    #[serde(default)]
    pub turn: TurnConfig,

    #[serde(default)]
    pub web: WebConfig,
}

fn default_chat_model() -> String {
    "chat-model".to_string()
}

fn default_max_page_limit() -> u32 {
    100
}

fn default_session_ttl_hours() -> u32 {
    720
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_chat_model: default_chat_model(),
            max_page_limit: default_max_page_limit(),
            session_ttl_hours: default_session_ttl_hours(),
            entitlements: Entitlements::default(),
            turn: TurnConfig::default(),
            web: WebConfig::default(),
        }
    }
}

/// Daily message allowance per user type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlements {
    #[serde(default = "default_guest")]
    pub guest: Entitlement,
    #[serde(default = "default_regular")]
    pub regular: Entitlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub max_messages_per_day: u32,
}

fn default_guest() -> Entitlement {
    Entitlement {
        max_messages_per_day: 20,
    }
}

fn default_regular() -> Entitlement {
    Entitlement {
        max_messages_per_day: 100,
    }
}

impl Default for Entitlements {
    fn default() -> Self {
        Self {
            guest: default_guest(),
            regular: default_regular(),
        }
    }
}

impl Entitlements {
    pub fn for_user_type(&self, user_type: UserType) -> Entitlement {
        match user_type {
            UserType::Guest => self.guest,
            UserType::Regular => self.regular,
        }
    }
}

/// Where chat turns are streamed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// External streaming endpoint. `None` selects the built-in echo transport.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_turn_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_turn_timeout_secs() -> u64 {
    300
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_turn_timeout_secs(),
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Mark the session cookie `Secure` (enable behind TLS).
    #[serde(default)]
    pub cookie_secure: bool,

    /// Page size the history listing uses when the client omits `limit`.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
}

fn default_history_page_size() -> u32 {
    20
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cookie_secure: false,
            history_page_size: default_history_page_size(),
        }
    }
}
