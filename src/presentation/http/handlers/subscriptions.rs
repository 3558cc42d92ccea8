//! Subscription Handlers
//!
//! Paid private access to a creator's private posts.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::response::{
    PrivateAccessResponse, PurchaseResponse, SubscriptionStatusResponse,
};
use crate::application::services::SubscriptionService;
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::{GatewayEvent, WalletUpdateEvent};
use crate::shared::error::AppError;
use crate::shared::validation::parse_id;
use crate::startup::AppState;

/// Buy or extend access to a creator
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(creator_id): Path<String>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let creator_id = parse_id(&creator_id, "user")?;

    let receipt = state
        .subscription_service()
        .subscribe(auth.user_id, creator_id)
        .await?;
    metrics::record_wallet_transfer("subscription");

    for (user_id, balance) in [
        (auth.user_id, receipt.subscriber_balance),
        (creator_id, receipt.creator_balance),
    ] {
        state.gateway.dispatch_to_users(
            &GatewayEvent::WalletUpdate(WalletUpdateEvent {
                balance: balance.amount(),
            }),
            &[user_id],
        );
    }

    Ok((StatusCode::CREATED, Json(PurchaseResponse::from(receipt))))
}

/// Access status for one creator
pub async fn get_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(creator_id): Path<String>,
) -> Result<Json<SubscriptionStatusResponse>, AppError> {
    let creator_id = parse_id(&creator_id, "user")?;

    let access = state
        .subscription_service()
        .status(auth.user_id, creator_id)
        .await?;

    Ok(Json(SubscriptionStatusResponse {
        creator_id: creator_id.to_string(),
        active: access.as_ref().is_some_and(|a| a.is_active()),
        access: access.map(PrivateAccessResponse::from),
    }))
}

/// The caller's active subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<PrivateAccessResponse>>, AppError> {
    let rows = state
        .subscription_service()
        .list_subscriptions(auth.user_id)
        .await?;
    Ok(Json(rows.into_iter().map(PrivateAccessResponse::from).collect()))
}

/// The caller's active subscribers
pub async fn list_subscribers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<PrivateAccessResponse>>, AppError> {
    let rows = state
        .subscription_service()
        .list_subscribers(auth.user_id)
        .await?;
    Ok(Json(rows.into_iter().map(PrivateAccessResponse::from).collect()))
}
