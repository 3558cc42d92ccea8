//! Wallet Handlers

use axum::{
    extract::{Extension, Query, State},
    Json,
};

use crate::application::dto::request::DepositRequest;
use crate::application::dto::response::{WalletResponse, WalletTransactionResponse};
use crate::application::services::WalletService;
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::{GatewayEvent, WalletUpdateEvent};
use crate::shared::error::AppError;
use crate::shared::pagination::{CursorQuery, Page, Paginated};
use crate::shared::validation::validate_body;
use crate::startup::AppState;

/// Current balance
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.wallet_service().get_wallet(auth.user_id).await?;
    Ok(Json(WalletResponse::from(wallet)))
}

/// Ledger entries, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(cursor): Query<CursorQuery>,
) -> Result<Json<Paginated<WalletTransactionResponse>>, AppError> {
    let page = Page::try_from(cursor)?;

    let entries = state
        .wallet_service()
        .list_transactions(auth.user_id, page)
        .await?;

    Ok(Json(
        Paginated::from_items(entries, &page, |e| e.id).map(WalletTransactionResponse::from),
    ))
}

/// Top up one's own wallet when self deposits are enabled
pub async fn deposit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<DepositRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    validate_body(&body)?;

    let wallet = state
        .wallet_service()
        .deposit(auth.user_id, body.amount)
        .await?;
    metrics::record_wallet_transfer("deposit");

    state.gateway.dispatch_to_users(
        &GatewayEvent::WalletUpdate(WalletUpdateEvent {
            balance: wallet.balance.amount(),
        }),
        &[auth.user_id],
    );

    Ok(Json(WalletResponse::from(wallet)))
}
