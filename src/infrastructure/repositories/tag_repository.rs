//! Tag Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{TagCount, TagRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct TagCountRow {
    id: i64,
    name: String,
    post_count: i64,
}

impl TagCountRow {
    fn into_tag(self) -> TagCount {
        TagCount {
            id: self.id,
            name: self.name,
            post_count: self.post_count,
        }
    }
}

/// PostgreSQL tag repository implementation.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: PgPool,
}

impl PgTagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    /// `prefix` is already normalised to `[a-z0-9_-]`, so `_` is the only
    /// LIKE wildcard left to escape.
    async fn search_prefix(&self, prefix: String, limit: i64) -> Result<Vec<TagCount>, AppError> {
        let pattern = format!("{}%", prefix.replace('_', "\\_"));
        let rows = sqlx::query_as::<_, TagCountRow>(
            r#"
            SELECT t.id, t.name, COUNT(p.id) AS post_count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            LEFT JOIN posts p ON p.id = pt.post_id AND p.deleted_at IS NULL
            WHERE t.name LIKE $1
            GROUP BY t.id, t.name
            ORDER BY t.name
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_tag()).collect())
    }

    async fn popular(&self, limit: i64) -> Result<Vec<TagCount>, AppError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            r#"
            SELECT t.id, t.name, COUNT(*) AS post_count
            FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            JOIN posts p ON p.id = pt.post_id AND p.deleted_at IS NULL
            GROUP BY t.id, t.name
            ORDER BY post_count DESC, t.name
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_tag()).collect())
    }
}
