//! Rate Limiting Middleware
//!
//! Redis-based sliding window rate limiting with one tier per endpoint
//! group. Limits come from `rate_limit` settings. Without Redis, or when a
//! Redis call fails, requests pass through.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::infrastructure::cache::keys;
use crate::presentation::middleware::auth::AuthUser;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

const WINDOW_SECONDS: u64 = 60;

/// Endpoint groups with separate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
    /// Login, register and token refresh
    Auth,
    /// Everything else under /api/v1
    Api,
    /// Gateway upgrades
    WebSocket,
}

impl RateLimitTier {
    /// Requests allowed per window, burst included.
    pub fn max_requests(&self, settings: &RateLimitSettings) -> u32 {
        let base = match self {
            Self::Auth => settings.auth_per_minute,
            Self::Api => settings.api_per_minute,
            Self::WebSocket => settings.websocket_per_minute,
        };
        base.saturating_add(settings.burst_size)
    }

    fn key_name(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Api => "api",
            Self::WebSocket => "ws",
        }
    }
}

/// Rate limit status returned to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: i64,
    /// Seconds until another request is allowed
    pub retry_after: u64,
}

#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    rate_limit: RateLimitInfo,
}

/// Sliding window kept in a Redis sorted set scored by request time.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_start = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])
local window_seconds = tonumber(ARGV[4])

redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)
local current_count = redis.call('ZCARD', key)

if current_count < max_requests then
    local member = now_ms .. ':' .. math.random(1000000)
    redis.call('ZADD', key, now_ms, member)
    redis.call('EXPIRE', key, window_seconds + 1)
    return {1, current_count + 1}
else
    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = 0
    if oldest and #oldest >= 2 then
        retry_after = oldest[2] + (window_seconds * 1000) - now_ms
    end
    return {0, current_count, retry_after}
end
"#;

/// Distributed limiter for one tier.
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    tier: RateLimitTier,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, tier: RateLimitTier, settings: &RateLimitSettings) -> Self {
        Self {
            redis,
            tier,
            max_requests: tier.max_requests(settings),
        }
    }

    /// `Ok` when allowed, `Err` with retry information when limited.
    /// Redis failures allow the request.
    pub async fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        let key = keys::rate_limit(self.tier.key_name(), identifier);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_start = now_ms - (WINDOW_SECONDS * 1000) as i64;
        let reset_at = now_ms / 1000 + WINDOW_SECONDS as i64;

        let mut conn = self.redis.clone();
        let result: Vec<i64> = match redis::Script::new(SLIDING_WINDOW_SCRIPT)
            .key(&key)
            .arg(now_ms)
            .arg(window_start)
            .arg(self.max_requests as i64)
            .arg(WINDOW_SECONDS as i64)
            .invoke_async(&mut conn)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Rate limiter Redis error");
                return Ok(RateLimitInfo {
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_at,
                    retry_after: 0,
                });
            }
        };

        match evaluate(&result, self.max_requests, reset_at) {
            (true, info) => Ok(info),
            (false, info) => Err(info),
        }
    }
}

/// Interpret the script reply `{allowed, count, retry_after_ms?}`.
fn evaluate(result: &[i64], max_requests: u32, reset_at: i64) -> (bool, RateLimitInfo) {
    let allowed = result.first().copied() == Some(1);
    let count = result.get(1).copied().unwrap_or(0).max(0) as u32;
    let retry_ms = result.get(2).copied().unwrap_or(0).max(0);

    (
        allowed,
        RateLimitInfo {
            limit: max_requests,
            remaining: max_requests.saturating_sub(count),
            reset_at,
            retry_after: if allowed {
                0
            } else {
                (retry_ms as u64).div_ceil(1000)
            },
        },
    )
}

/// Peer address recorded by `into_make_service_with_connect_info`, if any.
fn peer_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

/// Who the limit applies to: the authenticated user, else the client IP.
fn extract_identifier(request: &Request, client_ip: Option<IpAddr>) -> String {
    if let Some(auth_user) = request.extensions().get::<AuthUser>() {
        return format!("user:{}", auth_user.user_id);
    }

    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
        })
        .and_then(|ip| ip.parse::<IpAddr>().ok());

    match forwarded.or(client_ip) {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

pub async fn rate_limit_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    rate_limit_inner(state, request, next, RateLimitTier::Auth).await
}

pub async fn rate_limit_api(State(state): State<AppState>, request: Request, next: Next) -> Response {
    rate_limit_inner(state, request, next, RateLimitTier::Api).await
}

pub async fn rate_limit_websocket(State(state): State<AppState>, request: Request, next: Next) -> Response {
    rate_limit_inner(state, request, next, RateLimitTier::WebSocket).await
}

async fn rate_limit_inner(
    state: AppState,
    request: Request,
    next: Next,
    tier: RateLimitTier,
) -> Response {
    let Some(redis) = state.redis.clone() else {
        return next.run(request).await;
    };

    let identifier = extract_identifier(&request, peer_ip(&request));
    let limiter = RateLimiter::new(redis, tier, &state.settings.rate_limit);

    match limiter.check(&identifier).await {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(identifier = %identifier, tier = ?tier, "Rate limit exceeded");
            create_rate_limit_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(info.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(info.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(info.reset_at));
}

fn create_rate_limit_response(info: RateLimitInfo) -> Response {
    let info = RateLimitInfo {
        remaining: 0,
        ..info
    };
    let retry_after = HeaderValue::from(info.retry_after);
    let mut headers = HeaderMap::new();
    add_rate_limit_headers(&mut headers, &info);

    let body = RateLimitExceededResponse {
        error: ErrorResponse {
            code: 10006,
            message: "You are being rate limited. Please slow down.".to_string(),
            errors: None,
        },
        rate_limit: info,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response.headers_mut().extend(headers);
    response.headers_mut().insert(header::RETRY_AFTER, retry_after);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn settings() -> RateLimitSettings {
        RateLimitSettings {
            auth_per_minute: 5,
            api_per_minute: 60,
            websocket_per_minute: 10,
            burst_size: 2,
        }
    }

    #[test]
    fn test_tier_limits_include_burst() {
        let s = settings();
        assert_eq!(RateLimitTier::Auth.max_requests(&s), 7);
        assert_eq!(RateLimitTier::Api.max_requests(&s), 62);
        assert!(RateLimitTier::Auth.max_requests(&s) < RateLimitTier::Api.max_requests(&s));
    }

    #[test]
    fn test_evaluate_allowed() {
        let (allowed, info) = evaluate(&[1, 3], 10, 100);
        assert!(allowed);
        assert_eq!(info.remaining, 7);
        assert_eq!(info.retry_after, 0);
    }

    #[test]
    fn test_evaluate_limited_rounds_retry_up() {
        let (allowed, info) = evaluate(&[0, 10, 1500], 10, 100);
        assert!(!allowed);
        assert_eq!(info.remaining, 0);
        assert_eq!(info.retry_after, 2);
    }

    #[test]
    fn test_identifier_prefers_forwarded_ip() {
        let request = Request::builder()
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_identifier(&request, None), "ip:10.0.0.1");
    }

    #[test]
    fn test_identifier_falls_back_to_peer() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(extract_identifier(&request, Some(ip)), "ip:127.0.0.1");
        assert_eq!(extract_identifier(&request, None), "ip:unknown");
    }

    #[test]
    fn test_peer_ip_from_connect_info() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(peer_ip(&request), None);

        let addr: SocketAddr = "192.168.1.20:41000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(peer_ip(&request), Some(addr.ip()));
        assert_eq!(
            extract_identifier(&request, peer_ip(&request)),
            "ip:192.168.1.20"
        );
    }

    #[tokio::test]
    async fn test_passes_through_without_redis() {
        use axum::{http::StatusCode, middleware, routing::get, Router};
        use tower::ServiceExt;

        let settings = crate::config::Settings::for_tests().unwrap();
        let pool = crate::infrastructure::database::create_lazy_pool(&settings.database).unwrap();
        let state = AppState::new(settings, pool, None);
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_api))
            .with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("X-RateLimit-Limit").is_none());
    }
}
