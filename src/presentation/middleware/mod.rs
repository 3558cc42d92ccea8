//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cors;
pub mod logging;
pub mod rate_limit;
pub mod security;

pub use auth::{auth_middleware, require_admin, AuthUser};
pub use cors::create_cors_layer;
pub use logging::{create_trace_layer, track_metrics};
pub use rate_limit::{
    rate_limit_api, rate_limit_auth, rate_limit_websocket, RateLimitInfo, RateLimitTier,
    RateLimiter,
};
pub use security::{SecurityHeadersConfig, SecurityHeadersLayer};
