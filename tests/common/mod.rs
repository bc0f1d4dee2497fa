// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use clarity_api::config::Config;
use clarity_api::db::{Database, FirestoreDb};
use clarity_api::models::{LicenseTier, User};
use clarity_api::routes::create_router;
use clarity_api::services::{Mailer, StripeClient};
use clarity_api::time_utils::format_utc_rfc3339;
use clarity_api::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection against the emulator.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    Database::firestore(
        FirestoreDb::new("test-project")
            .await
            .expect("Failed to connect to Firestore emulator"),
    )
}

/// Handles to the offline collaborators behind a test app.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub mailer: Mailer,
    pub stripe: StripeClient,
}

/// Create a test app over the in-memory store with offline providers.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_db(Database::in_memory())
}

#[allow(dead_code)]
pub fn create_test_app_with_db(db: Database) -> TestApp {
    let config = Config::test_default();
    let mailer = Mailer::new_mock();
    let stripe = StripeClient::new_mock();

    let state = Arc::new(AppState::new(config, db, mailer.clone(), stripe.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        mailer,
        stripe,
    }
}

impl TestApp {
    /// Send one request through a clone of the router.
    #[allow(dead_code)]
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Token from the most recent magic-link email.
    #[allow(dead_code)]
    pub fn last_magic_link_token(&self) -> String {
        self.mailer
            .sent_emails()
            .iter()
            .rev()
            .find_map(|e| e.params.get("MAGIC_LINK").and_then(Value::as_str).map(str::to_string))
            .and_then(|url| url.split("token=").nth(1).map(str::to_string))
            .expect("no magic link email sent")
    }

    /// Run the full magic-link flow for `email` and return the session token.
    #[allow(dead_code)]
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api/auth/send-magic-link",
                &serde_json::json!({ "email": email }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let token = self.last_magic_link_token();
        let response = self
            .send(get(&format!("/api/auth/verify-magic-link?token={}", token)))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);

        session_cookie_value(&response).expect("session cookie set")
    }

    /// Log in and set the account's tier directly in the store.
    #[allow(dead_code)]
    pub async fn login_with_tier(&self, email: &str, tier: LicenseTier) -> (String, String) {
        let token = self.login(email).await;
        let user = self
            .state
            .db
            .find_user_by_email(email)
            .await
            .unwrap()
            .expect("user created on login");

        let mut data: User = user.data;
        data.license_tier = tier;
        self.state.db.update_user(&user.id, &data).await.unwrap();
        (token, user.id)
    }
}

/// Seed a user directly.
#[allow(dead_code)]
pub async fn seed_user(db: &Database, email: &str, tier: LicenseTier) -> String {
    let mut user = User::new_free(email.to_string(), format_utc_rfc3339(chrono::Utc::now()));
    user.license_tier = tier;
    db.create_user(&user).await.unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn get_with_session(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("clarity_session={}", token))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn json_request_with_session(method: &str, uri: &str, body: &Value, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("clarity_session={}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// Value of the `clarity_session` cookie set by a response, if any.
#[allow(dead_code)]
pub fn session_cookie_value(response: &Response) -> Option<String> {
    set_cookie_headers(response)
        .iter()
        .find_map(|c| c.strip_prefix("clarity_session="))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        .filter(|v| !v.is_empty())
}

#[allow(dead_code)]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string()
}
