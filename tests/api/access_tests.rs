//! Authentication and Authorization Guard Tests

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::{json, Value};

use market_server::domain::UserRole;

use crate::common::TestApp;

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/users/@me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], 10003);
}

#[tokio::test]
async fn test_malformed_authorization_header_rejected() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/wallet")
        .add_header("authorization", "Basic dXNlcjpwYXNz")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new();
    let token = app.token_expiring(42, UserRole::User, Duration::minutes(-10));

    let response = app
        .server
        .get("/api/v1/wallet")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let app = TestApp::new();
    let mut other = TestApp::new();
    other.settings.jwt.secret = "another-secret-that-is-at-least-32-characters".into();
    let token = other.token_for(42, UserRole::Admin);

    let response = app
        .server
        .get("/api/v1/admin/stats")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_users() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    for path in ["/api/v1/admin/stats", "/api/v1/admin/users", "/api/v1/admin/reports"] {
        let response = app
            .server
            .get(path)
            .authorization_bearer(token.clone())
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], 10004);
    }
}

#[tokio::test]
async fn test_admin_report_filter_validated() {
    let app = TestApp::new();
    let token = app.token_for(1, UserRole::Admin);

    let response = app
        .server
        .get("/api/v1/admin/reports")
        .add_query_param("status", "lost")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_path_id_is_bad_request() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    for path in [
        "/api/v1/users/not-a-number",
        "/api/v1/posts/0",
        "/api/v1/chat/requests/-5",
    ] {
        let response = app
            .server
            .get(path)
            .authorization_bearer(token.clone())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_self_deposit_disabled_by_default() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    let response = app
        .server
        .post("/api/v1/wallet/deposit")
        .authorization_bearer(token)
        .json(&json!({ "amount": 100 }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deposit_amount_validated() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    let response = app
        .server
        .post("/api/v1/wallet/deposit")
        .authorization_bearer(token)
        .json(&json!({ "amount": 0 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
