//! Authentication Handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::application::dto::request::{LoginRequest, RefreshTokenRequest, RegisterRequest};
use crate::application::dto::response::{AuthResponse, TokenResponse, UserResponse};
use crate::application::services::AuthService;
use crate::shared::error::AppError;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_body(&body)?;

    let (user, tokens) = state
        .auth_service()
        .register(&body.username, &body.email, &body.password)
        .await?;

    let response = AuthResponse {
        user: UserResponse::from_user(user),
        tokens: tokens.into(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_body(&body)?;

    let (user, tokens) = state
        .auth_service()
        .authenticate(&body.email, &body.password)
        .await?;

    Ok(Json(AuthResponse {
        user: UserResponse::from_user(user),
        tokens: tokens.into(),
    }))
}

/// Refresh access token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_body(&body)?;

    let tokens = state.auth_service().refresh_token(&body.refresh_token).await?;

    Ok(Json(TokenResponse::from(tokens)))
}

/// Logout (revoke refresh token)
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<StatusCode, AppError> {
    // Unknown tokens are not an error
    state.auth_service().revoke_token(&body.refresh_token).await?;

    Ok(StatusCode::NO_CONTENT)
}
