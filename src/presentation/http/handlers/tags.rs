//! Tag Handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::application::dto::request::{LimitQuery, TagQuery};
use crate::application::dto::response::TagResponse;
use crate::application::services::TagService;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Autocomplete by prefix
pub async fn search_tags(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = state.tag_service().search(&query.prefix, query.limit).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// Tags ordered by live post count
pub async fn popular_tags(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = state.tag_service().popular(query.limit).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}
