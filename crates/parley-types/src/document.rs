//! Artifact documents and the edit suggestions attached to them.
//!
//! A document is versioned by its creation timestamp: every save inserts a
//! new `(id, created_at)` row. Suggestions point at one specific version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// What an artifact panel renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    #[default]
    Text,
    Code,
    Image,
    Sheet,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Text => write!(f, "text"),
            ArtifactKind::Code => write!(f, "code"),
            ArtifactKind::Image => write!(f, "image"),
            ArtifactKind::Sheet => write!(f, "sheet"),
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ArtifactKind::Text),
            "code" => Ok(ArtifactKind::Code),
            "image" => Ok(ArtifactKind::Image),
            "sheet" => Ok(ArtifactKind::Sheet),
            other => Err(format!("invalid artifact kind: '{other}'")),
        }
    }
}

/// One version of an artifact document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub kind: ArtifactKind,
    pub content: Option<String>,
    pub user_id: Uuid,
}

/// A proposed edit against a specific document version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_created_at: DateTime<Utc>,
    pub original_text: String,
    pub suggested_text: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
