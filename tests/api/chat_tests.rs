//! Chat and Gateway Endpoint Tests

use axum::http::StatusCode;
use serde_json::json;

use market_server::domain::UserRole;

use crate::common::TestApp;

#[tokio::test]
async fn test_list_requests_rejects_unknown_role() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    let response = app
        .server
        .get("/api/v1/chat/requests")
        .add_query_param("role", "bystander")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_requests_rejects_bad_cursor() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    let response = app
        .server
        .get("/api/v1/chat/requests")
        .add_query_param("before", "yesterday")
        .authorization_bearer(token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_request_validates_recipient() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    let response = app
        .server
        .post("/api/v1/chat/requests")
        .authorization_bearer(token)
        .json(&json!({ "recipient_id": "someone", "message": "hello" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transaction_amount_validated() {
    let app = TestApp::new();
    let token = app.token_for(42, UserRole::User);

    let response = app
        .server
        .post("/api/v1/chat/requests/123/transactions")
        .authorization_bearer(token)
        .json(&json!({ "amount": -1 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gateway_requires_upgrade() {
    let app = TestApp::new();

    let response = app.server.get("/gateway").await;

    assert!(response.status_code().is_client_error());
}
