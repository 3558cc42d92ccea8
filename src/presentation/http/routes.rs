//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, services::ServeDir};

use super::handlers::{admin, auth, chat, health, posts, reports, subscriptions, tags, users, wallet};
use crate::config::MediaSettings;
use crate::presentation::middleware::{
    auth_middleware, create_cors_layer, create_trace_layer, rate_limit_api, rate_limit_auth,
    rate_limit_websocket, require_admin, track_metrics, SecurityHeadersConfig,
    SecurityHeadersLayer,
};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Multipart slack on top of the image payload itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Body limit for routes that accept a full container of images.
fn upload_limit(media: &MediaSettings) -> DefaultBodyLimit {
    DefaultBodyLimit::max(
        media
            .max_image_bytes
            .saturating_mul(media.max_images_per_container)
            .saturating_add(MULTIPART_OVERHEAD),
    )
}

/// Create the main router with every middleware layer applied
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        .merge(gateway_routes(state.clone()))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(health::metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
        // Content-addressed uploads, served as static files
        .nest_service(
            &settings.media.public_path,
            ServeDir::new(&settings.media.root),
        )
        .layer(create_trace_layer())
        .layer(create_cors_layer(&settings.cors))
        // Outermost so every response carries the headers
        .layer(SecurityHeadersLayer::with_config(
            SecurityHeadersConfig::for_environment(&settings.environment),
        ))
        .with_state(state)
}

/// WebSocket gateway endpoint with its own rate limit tier
fn gateway_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/gateway", get(ws_handler))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_websocket))
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .merge(protected_routes(state.clone()))
        .nest("/admin", admin_routes(state))
        .layer(CompressionLayer::new())
}

/// Authentication routes (public, with stricter rate limiting)
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh_token))
        .route("/logout", post(auth::logout))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_auth))
}

/// Everything that needs a logged-in user
fn protected_routes(state: AppState) -> Router<AppState> {
    let uploads = upload_limit(&state.settings.media);

    Router::new()
        // Users
        .route(
            "/users/@me",
            get(users::get_current_user).patch(users::update_current_user),
        )
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/posts", get(users::get_user_posts))
        .route("/users/{user_id}/ratings", get(users::get_user_ratings))
        // Posts
        .route("/posts", post(posts::create_post))
        .route("/posts/feed", get(posts::get_feed))
        .route(
            "/posts/{post_id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/{post_id}/images",
            post(posts::add_post_images).layer(uploads.clone()),
        )
        .route(
            "/posts/{post_id}/images/{image_id}",
            delete(posts::remove_post_image),
        )
        // Tags
        .route("/tags", get(tags::search_tags))
        .route("/tags/popular", get(tags::popular_tags))
        // Chat
        .route(
            "/chat/requests",
            post(chat::create_request).get(chat::list_requests),
        )
        .route("/chat/requests/{request_id}", get(chat::get_request))
        .route("/chat/requests/{request_id}/accept", post(chat::accept_request))
        .route("/chat/requests/{request_id}/reject", post(chat::reject_request))
        .route(
            "/chat/requests/{request_id}/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route(
            "/chat/requests/{request_id}/messages/complex",
            post(chat::send_complex_message).layer(uploads),
        )
        .route(
            "/chat/requests/{request_id}/transactions",
            post(chat::send_transaction),
        )
        .route("/chat/requests/{request_id}/end", post(chat::request_end))
        .route("/chat/requests/{request_id}/end/approve", post(chat::approve_end))
        .route("/chat/requests/{request_id}/ratings", post(chat::rate_request))
        // Wallet
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/wallet/deposit", post(wallet::deposit))
        // Private access
        .route("/subscriptions", get(subscriptions::list_subscriptions))
        .route(
            "/subscriptions/{creator_id}",
            post(subscriptions::subscribe).get(subscriptions::get_status),
        )
        .route("/subscribers", get(subscriptions::list_subscribers))
        // Reports
        .route("/reports/users/{user_id}", post(reports::report_user))
        .route("/reports/posts/{post_id}", post(reports::report_post))
        .route("/reports/mine", get(reports::list_my_reports))
        // Auth runs first so the limiter can key on the user
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_api))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Admin routes (auth + admin role)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{user_id}/ban", post(admin::ban_user))
        .route("/users/{user_id}/unban", post(admin::unban_user))
        .route("/posts/{post_id}", delete(admin::delete_post))
        .route("/reports", get(admin::list_reports))
        .route("/reports/{report_id}/resolve", post(admin::resolve_report))
        .route("/wallets/{user_id}/adjust", post(admin::adjust_wallet))
        .route("/stats", get(admin::get_stats))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_api))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
