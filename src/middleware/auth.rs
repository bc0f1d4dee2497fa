// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Session authentication middleware.

use crate::db::Record;
use crate::error::AppError;
use crate::models::User;
use crate::services::sessions;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "clarity_session";

/// Authenticated user resolved from the session.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Record<User>);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

/// Session token from the cookie, falling back to an `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string()).filter(|t| !t.is_empty());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Middleware that requires a live session.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers());
    let user = sessions::resolve(&state.db, token.as_deref(), Utc::now()).await?;

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn test_cookie_takes_precedence() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from_cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from_header"));

        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from_cookie"));
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(
            session_token(&CookieJar::new(), &headers).as_deref(),
            Some("abc123")
        );

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(session_token(&CookieJar::new(), &headers), None);
    }

    #[test]
    fn test_no_token() {
        assert_eq!(session_token(&CookieJar::new(), &HeaderMap::new()), None);
    }
}
