//! Rating Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Rating, RatingRepository, RatingSummary};
use crate::shared::error::{conflict_on_unique, AppError};
use crate::shared::pagination::Page;

#[derive(Debug, sqlx::FromRow)]
struct RatingRow {
    id: i64,
    request_id: i64,
    rater_id: i64,
    ratee_id: i64,
    score: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl RatingRow {
    fn into_rating(self) -> Rating {
        Rating {
            id: self.id,
            request_id: self.request_id,
            rater_id: self.rater_id,
            ratee_id: self.ratee_id,
            score: self.score,
            comment: self.comment,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL rating repository implementation.
#[derive(Clone)]
pub struct PgRatingRepository {
    pool: PgPool,
}

impl PgRatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingRepository for PgRatingRepository {
    async fn create(&self, rating: &Rating) -> Result<Rating, AppError> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            INSERT INTO ratings (id, request_id, rater_id, ratee_id, score, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, request_id, rater_id, ratee_id, score, comment, created_at
            "#,
        )
        .bind(rating.id)
        .bind(rating.request_id)
        .bind(rating.rater_id)
        .bind(rating.ratee_id)
        .bind(rating.score)
        .bind(&rating.comment)
        .bind(rating.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "You have already rated this chat"))?;

        Ok(row.into_rating())
    }

    async fn list_for_user(&self, ratee_id: i64, page: Page) -> Result<Vec<Rating>, AppError> {
        let rows = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT id, request_id, rater_id, ratee_id, score, comment, created_at
            FROM ratings
            WHERE ratee_id = $1 AND id < $2
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(ratee_id)
        .bind(page.before_or_max())
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_rating()).collect())
    }

    async fn summary(&self, ratee_id: i64) -> Result<RatingSummary, AppError> {
        let (average, count) = sqlx::query_as::<_, (Option<f64>, i64)>(
            "SELECT AVG(score)::float8, COUNT(*) FROM ratings WHERE ratee_id = $1",
        )
        .bind(ratee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary { average, count })
    }
}
