//! Rating entity and repository trait.
//!
//! Maps to the `ratings` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;
use crate::shared::pagination::Page;

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

/// A score one chat participant gives the other after the chat ended.
///
/// Maps to the `ratings` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - request_id: BIGINT NOT NULL REFERENCES chat_requests(id)
/// - rater_id: BIGINT NOT NULL REFERENCES users(id)
/// - ratee_id: BIGINT NOT NULL REFERENCES users(id)
/// - score: SMALLINT NOT NULL CHECK (score BETWEEN 1 AND 5)
/// - comment: TEXT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - UNIQUE (request_id, rater_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub request_id: i64,
    pub rater_id: i64,
    pub ratee_id: i64,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Average score and count for a user.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

/// Repository trait for Rating data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Insert a rating. Returns `Conflict` if the rater already rated this request.
    async fn create(&self, rating: &Rating) -> Result<Rating, AppError>;

    /// Ratings received by a user, newest first.
    async fn list_for_user(&self, ratee_id: i64, page: Page) -> Result<Vec<Rating>, AppError>;

    async fn summary(&self, ratee_id: i64) -> Result<RatingSummary, AppError>;
}
