// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Router-level behavior: health, method handling, headers, CORS.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{body_json, create_test_app, get};

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["build_id"].is_string());
}

#[tokio::test]
async fn test_wrong_method_returns_json_405() {
    let app = create_test_app();

    for (method, uri) in [
        (Method::GET, "/api/auth/send-magic-link"),
        (Method::POST, "/api/auth/me"),
        (Method::GET, "/api/stripe/webhook"),
        (Method::DELETE, "/api/sync/save"),
        (Method::PUT, "/api/license/check"),
    ] {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;

        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{} {}",
            method,
            uri
        );
        let body = body_json(response).await;
        assert_eq!(body["error"], "method_not_allowed");
    }
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_test_app();

    let response = app.send(get("/api/does-not-exist")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = create_test_app();

    for uri in ["/health", "/api/auth/me", "/api/sync/list"] {
        let response = app.send(get(uri)).await;
        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff", "{}", uri);
        assert_eq!(headers["x-frame-options"], "DENY", "{}", uri);
        assert!(headers.contains_key("strict-transport-security"), "{}", uri);
        assert!(headers.contains_key("content-security-policy"), "{}", uri);
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    }
}

#[tokio::test]
async fn test_cors_allows_app_origin_with_credentials() {
    let app = create_test_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/auth/me")
        .header(header::ORIGIN, "https://app.example.test")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.test"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_ignores_foreign_origin() {
    let app = create_test_app();

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
