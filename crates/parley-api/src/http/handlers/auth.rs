//! Guest sign-in and sign-out.
//!
//! Endpoints:
//! - GET  /api/auth/guest?redirectUrl=/...  - create an anonymous session
//! - POST /api/auth/signout                 - revoke the current session

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use serde::Deserialize;

use parley_core::auth::provider::AuthProvider;
use parley_core::auth::{GuestSignIn, guest_sign_in};

use crate::http::error::AppError;
use crate::http::extractors::session::{clear_session_cookie, session_cookie, session_token};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GuestQuery {
    #[serde(rename = "redirectUrl")]
    pub redirect_url: Option<String>,
}

/// Only same-site absolute paths are followed after sign-in.
///
/// Browsers read `\` as `/`, so `/\host` is as off-site as `//host`.
fn safe_redirect(target: Option<&str>) -> &str {
    match target {
        Some(path) if is_local_path(path) => path,
        _ => "/",
    }
}

fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !path.chars().any(|c| c.is_ascii_control())
}

/// GET /api/auth/guest - sign in anonymously unless a session is live.
pub async fn guest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GuestQuery>,
) -> Result<Response, AppError> {
    match guest_sign_in(state.auth.as_ref(), session_token(&headers)).await? {
        GuestSignIn::AlreadySignedIn(_) => Ok(Redirect::to("/").into_response()),
        GuestSignIn::Created(issued) => {
            let max_age = u64::from(state.config.session_ttl_hours) * 3600;
            let cookie = session_cookie(&issued.token, max_age, state.config.web.cookie_secure);
            let target = safe_redirect(query.redirect_url.as_deref());
            Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(target)).into_response())
        }
    }
}

/// POST /api/auth/signout - revoke the session and clear the cookie.
pub async fn signout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        state.auth.sign_out(token).await?;
    }
    let cookie = clear_session_cookie(state.config.web.cookie_secure);
    Ok((StatusCode::NO_CONTENT, AppendHeaders([(SET_COOKIE, cookie)])).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirects_stay_on_site() {
        assert_eq!(safe_redirect(Some("/chat/1")), "/chat/1");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect(Some("//evil.example")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example")), "/");
        assert_eq!(safe_redirect(Some("/\\/evil")), "/");
        assert_eq!(safe_redirect(Some("/\t/evil.example")), "/");
        assert_eq!(safe_redirect(Some("/chat\n/1")), "/");
        assert_eq!(safe_redirect(Some("chat/1")), "/");
        assert_eq!(safe_redirect(Some("/")), "/");
        assert_eq!(safe_redirect(Some("/chat/a\\b")), "/chat/a\\b");
        assert_eq!(safe_redirect(None), "/");
    }
}
