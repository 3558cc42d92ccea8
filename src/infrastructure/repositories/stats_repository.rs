//! Platform counters for the admin dashboard.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Credits, PlatformStats, StatsRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    users: i64,
    banned_users: i64,
    live_posts: i64,
    pending_reports: i64,
    open_chat_requests: i64,
    credits_in_circulation: i64,
}

/// PostgreSQL stats repository implementation.
#[derive(Clone)]
pub struct PgStatsRepository {
    pool: PgPool,
}

impl PgStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PgStatsRepository {
    async fn platform_stats(&self) -> Result<PlatformStats, AppError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE banned) AS banned_users,
                (SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL) AS live_posts,
                (SELECT COUNT(*) FROM reports WHERE status = 'pending') AS pending_reports,
                (SELECT COUNT(*) FROM chat_requests
                  WHERE status IN ('pending', 'accepted')) AS open_chat_requests,
                (SELECT COALESCE(SUM(balance), 0)::bigint FROM wallets) AS credits_in_circulation
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformStats {
            users: row.users,
            banned_users: row.banned_users,
            live_posts: row.live_posts,
            pending_reports: row.pending_reports,
            open_chat_requests: row.open_chat_requests,
            credits_in_circulation: Credits::new(row.credits_in_circulation),
        })
    }
}
