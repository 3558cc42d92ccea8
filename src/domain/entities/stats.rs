//! Platform-wide counters for the admin dashboard.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Credits;
use crate::shared::error::AppError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlatformStats {
    pub users: i64,
    pub banned_users: i64,
    pub live_posts: i64,
    pub pending_reports: i64,
    pub open_chat_requests: i64,
    /// Sum of all wallet balances
    pub credits_in_circulation: Credits,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn platform_stats(&self) -> Result<PlatformStats, AppError>;
}
