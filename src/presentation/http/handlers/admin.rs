//! Admin Handlers
//!
//! Mounted behind `auth_middleware` and `require_admin`.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AdjustWalletRequest, AdminReportQuery, AdminUserQuery, ResolveReportRequest,
};
use crate::application::dto::response::{
    ReportResponse, StatsResponse, UserResponse, WalletResponse,
};
use crate::application::services::{AdminService, ReportResolution};
use crate::domain::ReportStatus;
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::{GatewayEvent, WalletUpdateEvent};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, Paginated};
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

fn parse_status(raw: &str) -> Result<ReportStatus, AppError> {
    ReportStatus::parse(raw).ok_or_else(|| {
        AppError::invalid_field("status", "Status must be pending, resolved or dismissed")
    })
}

/// Search users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<AdminUserQuery>,
) -> Result<Json<Paginated<UserResponse>>, AppError> {
    let page = Page::try_from(query.cursor())?;

    let users = state.admin_service().list_users(query.query, page).await?;

    Ok(Json(
        Paginated::from_items(users, &page, |u| u.id).map(UserResponse::from_user),
    ))
}

/// Ban a user and revoke their sessions
pub async fn ban_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    state.admin_service().ban(auth.user_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lift a ban
pub async fn unban_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    state.admin_service().unban(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove any post
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = parse_id(&post_id, "post")?;
    state.admin_service().delete_post(auth.user_id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reports, optionally filtered by status
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<AdminReportQuery>,
) -> Result<Json<Paginated<ReportResponse>>, AppError> {
    let page = Page::try_from(query.cursor())?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;

    let reports = state.admin_service().list_reports(status, page).await?;

    Ok(Json(
        Paginated::from_items(reports, &page, |r| r.id).map(ReportResponse::from),
    ))
}

/// Close a pending report, optionally acting on its target
pub async fn resolve_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(report_id): Path<String>,
    Json(body): Json<ResolveReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    let report_id = parse_id(&report_id, "report")?;
    validate_body(&body)?;

    let resolution = ReportResolution {
        status: parse_status(&body.status)?,
        note: body.note,
        action: body.action,
    };

    let report = state
        .admin_service()
        .resolve_report(auth.user_id, report_id, resolution)
        .await?;

    Ok(Json(ReportResponse::from(report)))
}

/// Signed balance correction
pub async fn adjust_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(body): Json<AdjustWalletRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    validate_body(&body)?;

    let wallet = state
        .admin_service()
        .adjust_wallet(auth.user_id, user_id, body.amount, body.note)
        .await?;
    metrics::record_wallet_transfer("adjustment");

    state.gateway.dispatch_to_users(
        &GatewayEvent::WalletUpdate(WalletUpdateEvent {
            balance: wallet.balance.amount(),
        }),
        &[user_id],
    );

    Ok(Json(WalletResponse::from(wallet)))
}

/// Platform counters
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.admin_service().stats().await?;
    Ok(Json(StatsResponse::from(stats)))
}
