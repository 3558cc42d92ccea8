//! Cache Module
//!
//! Redis connection management. Redis backs the rate limiter only and is
//! optional: an empty `redis.url` leaves the server running without it.

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// `PING` round trip used by the readiness endpoint.
pub async fn ping(conn: &mut ConnectionManager) -> Result<(), redis::RedisError> {
    redis::cmd("PING").query_async::<String>(conn).await.map(|_| ())
}

/// Cache key prefixes.
pub mod keys {
    /// Prefix for rate limiting windows (e.g., "ratelimit:api:user:42")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Generates a rate limit key
    #[inline]
    pub fn rate_limit(tier: &str, client: impl std::fmt::Display) -> String {
        format!("{}{}:{}", RATE_LIMIT, tier, client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(keys::rate_limit("auth", "ip:127.0.0.1"), "ratelimit:auth:ip:127.0.0.1");
    }
}
