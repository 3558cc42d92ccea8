//! User Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use crate::application::dto::request::UpdateProfileRequest;
use crate::application::dto::response::{
    PostResponse, ProfileResponse, RatingResponse, UserResponse,
};
use crate::application::services::{PostService, RatingService, UserService};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::{CursorQuery, Page, Paginated};
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

/// Get current authenticated user with balance
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let (user, wallet) = state.user_service().get_me(auth.user_id).await?;

    Ok(Json(UserResponse::with_wallet(user, &wallet)))
}

/// Update current user profile
pub async fn update_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate_body(&body)?;

    let user = state
        .user_service()
        .update_profile(auth.user_id, body.into())
        .await?;

    Ok(Json(UserResponse::from_user(user)))
}

/// Get a public profile
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user_id = parse_id(&user_id, "user")?;

    let profile = state
        .user_service()
        .get_profile(auth.user_id, user_id)
        .await?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// Posts by one author, access applied per post
pub async fn get_user_posts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Query(cursor): Query<CursorQuery>,
) -> Result<Json<Paginated<PostResponse>>, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    let page = Page::try_from(cursor)?;

    let views = state
        .post_service()
        .list_by_author(auth.viewer(), user_id, page)
        .await?;

    let public_path = &state.settings.media.public_path;
    Ok(Json(
        Paginated::from_items(views, &page, |v| v.post.id)
            .map(|v| PostResponse::from_view(v, public_path)),
    ))
}

/// Ratings received by a user
pub async fn get_user_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(cursor): Query<CursorQuery>,
) -> Result<Json<Paginated<RatingResponse>>, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    let page = Page::try_from(cursor)?;

    let ratings = state.rating_service().list_for_user(user_id, page).await?;

    Ok(Json(
        Paginated::from_items(ratings, &page, |r| r.id).map(RatingResponse::from),
    ))
}
