//! Chat history listing.
//!
//! GET /api/history?limit=&starting_after=&ending_before=
//!
//! Returns `{chats, hasMore}` for the signed-in user, newest first.

use std::time::Instant;

use axum::extract::{Query, State};
use serde::Deserialize;
use uuid::Uuid;

use parley_types::page::{ChatPage, PageRequest};

use crate::http::error::AppError;
use crate::http::extractors::session::CurrentUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Raw query parameters; ids are parsed by hand so a bad cursor gets the
/// JSON error envelope instead of a plain-text rejection.
#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub starting_after: Option<String>,
    pub ending_before: Option<String>,
}

fn parse_cursor(value: Option<&str>, name: &str) -> Result<Option<Uuid>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<Uuid>()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("invalid {name}: {v}"))),
    }
}

impl HistoryQuery {
    fn into_page_request(self, default_limit: u32) -> Result<PageRequest, AppError> {
        let limit = match self.limit.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => default_limit,
            Some(v) => v
                .parse::<u32>()
                .map_err(|_| AppError::Validation(format!("invalid limit: {v}")))?,
        };
        Ok(PageRequest {
            limit,
            starting_after: parse_cursor(self.starting_after.as_deref(), "starting_after")?,
            ending_before: parse_cursor(self.ending_before.as_deref(), "ending_before")?,
        })
    }
}

/// GET /api/history
pub async fn list_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<ApiResponse<ChatPage>, AppError> {
    let start = Instant::now();
    let request = query.into_page_request(state.config.web.history_page_size)?;
    let page = state.chat_service.list_chats(&user.id, &request).await?;
    Ok(ApiResponse::success(page, start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_limit_uses_default() {
        let request = HistoryQuery::default().into_page_request(20).unwrap();
        assert_eq!(request, PageRequest::first(20));
    }

    #[test]
    fn cursor_ids_are_parsed() {
        let id = Uuid::now_v7();
        let query = HistoryQuery {
            limit: Some("5".into()),
            starting_after: None,
            ending_before: Some(id.to_string()),
        };
        assert_eq!(query.into_page_request(20).unwrap(), PageRequest::before(5, id));
    }

    #[test]
    fn malformed_values_are_validation_errors() {
        let bad_limit = HistoryQuery {
            limit: Some("ten".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad_limit.into_page_request(20),
            Err(AppError::Validation(_))
        ));

        let bad_cursor = HistoryQuery {
            starting_after: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad_cursor.into_page_request(20),
            Err(AppError::Validation(_))
        ));
    }
}
