//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod auth;
pub mod chat;
pub mod document;
pub mod message;
pub mod pool;
pub mod vote;

use chrono::{DateTime, SecondsFormat, Utc};
use parley_types::error::RepositoryError;
use tracing::error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Column codecs shared by the repositories
// ---------------------------------------------------------------------------

/// Fixed-width RFC 3339 with microseconds, so text order equals time order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn parse_uuid(s: &str, column: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {column}: {e}")))
}

/// Log a failed statement and convert it. Every repository call goes through
/// this so store failures are visible before they propagate.
pub(crate) fn query_failed(operation: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        error!(operation, error = %e, "database query failed");
        RepositoryError::Query(e.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_datetime_is_fixed_width() {
        let whole = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let fractional = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let a = format_datetime(&whole);
        let b = format_datetime(&fractional);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert!(b.ends_with(".123456Z"));
        assert_eq!(parse_datetime(&a).unwrap(), whole);
    }
}
