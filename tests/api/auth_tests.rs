//! Authentication API Tests
//!
//! Validation runs before any database work, so these need no Postgres.

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{fake_email, fake_username, TestApp};

fn has_field_error(body: &Value, field: &str) -> bool {
    body["errors"]
        .as_array()
        .map(|errors| errors.iter().any(|e| e["field"] == field))
        .unwrap_or(false)
}

#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": fake_username(),
            "email": "not-an-email",
            "password": "ValidPassword123!"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], 10007);
    assert!(has_field_error(&body, "email"));
}

#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": fake_username(),
            "email": fake_email(),
            "password": "short"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], 10007);
    assert!(has_field_error(&body, "password"));
}

#[tokio::test]
async fn test_register_with_short_username_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": "a",
            "email": fake_email(),
            "password": "ValidPassword123!"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_with_empty_token_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": "" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
