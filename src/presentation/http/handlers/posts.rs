//! Post Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{CreatePostRequest, FeedQuery, UpdatePostRequest};
use crate::application::dto::response::PostResponse;
use crate::application::services::{PostService, PostView};
use crate::domain::services::PostAccess;
use crate::domain::Post;
use crate::presentation::http::extractors::UploadForm;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, Paginated};
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

/// Authors always see their own post in full.
fn full_view(post: Post) -> PostView {
    PostView {
        post,
        access: PostAccess::Full,
    }
}

/// Create a post
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), AppError> {
    validate_body(&body)?;

    let post = state.post_service().create(auth.user_id, body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from_view(
            full_view(post),
            &state.settings.media.public_path,
        )),
    ))
}

/// Newest-first feed with optional tag filter
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Paginated<PostResponse>>, AppError> {
    let page = Page::try_from(query.cursor())?;
    let tag = query.tag.filter(|t| !t.trim().is_empty());

    let views = state.post_service().feed(auth.viewer(), tag, page).await?;

    let public_path = &state.settings.media.public_path;
    Ok(Json(
        Paginated::from_items(views, &page, |v| v.post.id)
            .map(|v| PostResponse::from_view(v, public_path)),
    ))
}

/// Full post or locked preview
pub async fn get_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let post_id = parse_id(&post_id, "post")?;

    let view = state.post_service().get(auth.viewer(), post_id).await?;

    Ok(Json(PostResponse::from_view(
        view,
        &state.settings.media.public_path,
    )))
}

/// Update a post (author only)
pub async fn update_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let post_id = parse_id(&post_id, "post")?;
    validate_body(&body)?;

    let post = state
        .post_service()
        .update(auth.viewer(), post_id, body.into())
        .await?;

    Ok(Json(PostResponse::from_view(
        full_view(post),
        &state.settings.media.public_path,
    )))
}

/// Soft delete a post (author or admin)
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post_id = parse_id(&post_id, "post")?;

    state.post_service().delete(auth.viewer(), post_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Append images from multipart `file` parts
pub async fn add_post_images(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    form: UploadForm,
) -> Result<(StatusCode, Json<PostResponse>), AppError> {
    let post_id = parse_id(&post_id, "post")?;

    let post = state
        .post_service()
        .add_images(auth.viewer(), post_id, form.files)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from_view(
            full_view(post),
            &state.settings.media.public_path,
        )),
    ))
}

/// Remove one image from a post
pub async fn remove_post_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((post_id, image_id)): Path<(String, String)>,
) -> Result<Json<PostResponse>, AppError> {
    let post_id = parse_id(&post_id, "post")?;
    let image_id = parse_id(&image_id, "image")?;

    let post = state
        .post_service()
        .remove_image(auth.viewer(), post_id, image_id)
        .await?;

    Ok(Json(PostResponse::from_view(
        full_view(post),
        &state.settings.media.public_path,
    )))
}
