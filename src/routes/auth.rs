// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Magic-link authentication routes.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::auth::{session_token, SESSION_COOKIE};
use crate::models::PublicUser;
use crate::routes::extract::ValidatedJson;
use crate::services::auth::{VerifyError, SESSION_TTL_DAYS};
use crate::validation::EMAIL_RE;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/send-magic-link", post(send_magic_link))
        .route("/auth/verify-magic-link", get(verify_magic_link))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// Simple `{success, message}` acknowledgement.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
        })
    }
}

// ─── Magic Link ──────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct SendMagicLinkRequest {
    #[serde(default)]
    #[validate(regex(path = *EMAIL_RE, message = "Valid email is required"))]
    pub email: String,
}

async fn send_magic_link(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SendMagicLinkRequest>,
) -> Result<Json<MessageResponse>> {
    state.auth.request_magic_link(&body.email, Utc::now()).await?;
    Ok(MessageResponse::ok("Magic link sent! Check your email."))
}

#[derive(Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    token: Option<String>,
}

/// Verify a magic link. Always answers with a redirect, never JSON.
async fn verify_magic_link(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
    jar: CookieJar,
) -> Response {
    let app_url = &state.config.app_url;

    match state
        .auth
        .verify_magic_link(params.token.as_deref(), Utc::now())
        .await
    {
        Ok(session) => {
            let jar = jar.add(session_cookie(session.token));
            let target = format!("{}/clarity-engine-v2.html?login=success", app_url);
            (StatusCode::FOUND, jar, [(header::LOCATION, target)]).into_response()
        }
        Err(e) => {
            if let VerifyError::Failed(source) = &e {
                tracing::error!(error = %source, "Magic link verification failed");
            }
            let target = format!(
                "{}/login.html?error={}",
                app_url,
                urlencoding::encode(&e.to_string())
            );
            (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
        }
    }
}

fn session_cookie(token: String) -> Cookie<'static> {
    session_cookie_with_max_age(token, time::Duration::days(SESSION_TTL_DAYS))
}

/// Expired, empty session cookie. Sent on every logout, whether or not the
/// request carried a cookie.
fn cleared_session_cookie() -> Cookie<'static> {
    session_cookie_with_max_age(String::new(), time::Duration::ZERO)
}

fn session_cookie_with_max_age(token: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

// ─── Session ─────────────────────────────────────────────────

/// Log out. Succeeds even when there is no session or the delete fails.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Json<MessageResponse>) {
    let token = session_token(&jar, &headers);
    state.auth.logout(token.as_deref()).await;

    let jar = jar.add(cleared_session_cookie());
    (jar, MessageResponse::ok("Logged out successfully"))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: Option<PublicUser>,
}

async fn me(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<MeResponse>> {
    let token = session_token(&jar, &headers);
    let user = state.auth.whoami(token.as_deref(), Utc::now()).await?;

    Ok(Json(MeResponse {
        authenticated: user.is_some(),
        user,
    }))
}
