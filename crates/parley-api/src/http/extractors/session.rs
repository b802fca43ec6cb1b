//! Session cookie extractors.
//!
//! The session token travels in the `parley-session` cookie (set by the
//! guest sign-in route). `Authorization: Bearer <token>` is accepted too, for
//! scripted clients. Only the token's SHA-256 hash is ever looked up.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use parley_core::auth::get_user;
use parley_types::user::User;

use crate::http::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "parley-session";
pub const CHAT_MODEL_COOKIE: &str = "chat-model";

/// Value of cookie `name`, if present.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// The session token from the cookie or a bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = cookie_value(headers, SESSION_COOKIE) {
        return Some(token);
    }
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value that stores `token` for `max_age_secs`.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}{secure}")
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// The signed-in user. Rejects with 401 when there is no live session.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match get_user(state.auth.as_ref(), session_token(&parts.headers)).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(AppError::Unauthorized(
                "No active session. Sign in via /api/auth/guest first.".to_string(),
            )),
        }
    }
}

/// The signed-in user, if any. Page routes redirect instead of failing.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = get_user(state.auth.as_ref(), session_token(&parts.headers)).await?;
        Ok(MaybeUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let map = headers(&[("cookie", "theme=dark; parley-session=prl_abc; chat-model=fast")]);
        assert_eq!(cookie_value(&map, SESSION_COOKIE), Some("prl_abc"));
        assert_eq!(cookie_value(&map, CHAT_MODEL_COOKIE), Some("fast"));
        assert_eq!(cookie_value(&map, "missing"), None);
    }

    #[test]
    fn cookie_value_spans_multiple_headers() {
        let map = headers(&[("cookie", "a=1"), ("cookie", "parley-session=prl_x")]);
        assert_eq!(session_token(&map), Some("prl_x"));
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let map = headers(&[("authorization", "Bearer prl_token")]);
        assert_eq!(session_token(&map), Some("prl_token"));
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("prl_t", 3600, true);
        assert!(cookie.starts_with("parley-session=prl_t;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
