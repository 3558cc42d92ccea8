//! Report Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::CreateReportRequest;
use crate::application::dto::response::ReportResponse;
use crate::application::services::ReportService;
use crate::domain::ReportTarget;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::{CursorQuery, Page, Paginated};
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

async fn create_report(
    state: &AppState,
    auth: AuthUser,
    target: ReportTarget,
    body: CreateReportRequest,
) -> Result<(StatusCode, Json<ReportResponse>), AppError> {
    validate_body(&body)?;

    let report = state
        .report_service()
        .report(auth.user_id, target, body.reason, body.description)
        .await?;

    Ok((StatusCode::CREATED, Json(ReportResponse::from(report))))
}

/// Report a user
pub async fn report_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(body): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), AppError> {
    let user_id = parse_id(&user_id, "user")?;
    create_report(&state, auth, ReportTarget::User(user_id), body).await
}

/// Report a post
pub async fn report_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(body): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), AppError> {
    let post_id = parse_id(&post_id, "post")?;
    create_report(&state, auth, ReportTarget::Post(post_id), body).await
}

/// Reports filed by the caller
pub async fn list_my_reports(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(cursor): Query<CursorQuery>,
) -> Result<Json<Paginated<ReportResponse>>, AppError> {
    let page = Page::try_from(cursor)?;

    let reports = state.report_service().list_mine(auth.user_id, page).await?;

    Ok(Json(
        Paginated::from_items(reports, &page, |r| r.id).map(ReportResponse::from),
    ))
}
