//! Image Repository Implementation
//!
//! Images belong to an `image_containers` row owned by a post or a chat
//! message. File bytes live in media storage; only metadata is stored here.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::domain::{Image, ImageRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i64,
    container_id: i64,
    position: i32,
    file_name: String,
    content_type: String,
    size_bytes: i64,
    created_at: DateTime<Utc>,
}

impl ImageRow {
    fn into_image(self) -> Image {
        Image {
            id: self.id,
            container_id: self.container_id,
            position: self.position,
            file_name: self.file_name,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            created_at: self.created_at,
        }
    }
}

/// Images of several containers, each list ordered by position.
pub(crate) async fn load_images<'e, E>(
    executor: E,
    container_ids: &[i64],
) -> Result<HashMap<i64, Vec<Image>>, AppError>
where
    E: PgExecutor<'e>,
{
    let mut by_container: HashMap<i64, Vec<Image>> = HashMap::new();
    if container_ids.is_empty() {
        return Ok(by_container);
    }

    let rows = sqlx::query_as::<_, ImageRow>(
        r#"
        SELECT id, container_id, position, file_name, content_type, size_bytes, created_at
        FROM images
        WHERE container_id = ANY($1)
        ORDER BY container_id, position
        "#,
    )
    .bind(container_ids)
    .fetch_all(executor)
    .await?;

    for row in rows {
        by_container
            .entry(row.container_id)
            .or_default()
            .push(row.into_image());
    }
    Ok(by_container)
}

/// Create an empty container.
pub(crate) async fn create_container(
    conn: &mut PgConnection,
    container_id: i64,
    owner_id: i64,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO image_containers (id, owner_id) VALUES ($1, $2)")
        .bind(container_id)
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Reject an append that would push a container past `limit` images.
fn check_capacity(existing: i64, adding: usize, limit: usize) -> Result<(), AppError> {
    let existing = usize::try_from(existing).unwrap_or(0);
    if existing.saturating_add(adding) > limit {
        return Err(AppError::BadRequest(format!(
            "A container can hold at most {} images",
            limit
        )));
    }
    Ok(())
}

/// Insert images after the container's current last position.
///
/// With a `limit`, the image count is checked while the container row is
/// locked, so concurrent appends cannot overshoot it.
pub(crate) async fn insert_images(
    conn: &mut PgConnection,
    container_id: i64,
    images: &[Image],
    limit: Option<usize>,
) -> Result<Vec<Image>, AppError> {
    // Serialises concurrent appends to the same container
    sqlx::query("SELECT id FROM image_containers WHERE id = $1 FOR UPDATE")
        .bind(container_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Image container not found".into()))?;

    let (existing, next_position) = sqlx::query_as::<_, (i64, i32)>(
        "SELECT COUNT(*), COALESCE(MAX(position) + 1, 0) FROM images WHERE container_id = $1",
    )
    .bind(container_id)
    .fetch_one(&mut *conn)
    .await?;

    if let Some(limit) = limit {
        check_capacity(existing, images.len(), limit)?;
    }

    let mut stored = Vec::with_capacity(images.len());
    for (offset, image) in images.iter().enumerate() {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            INSERT INTO images (id, container_id, position, file_name, content_type, size_bytes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, container_id, position, file_name, content_type, size_bytes, created_at
            "#,
        )
        .bind(image.id)
        .bind(container_id)
        .bind(next_position + offset as i32)
        .bind(&image.file_name)
        .bind(&image.content_type)
        .bind(image.size_bytes)
        .bind(image.created_at)
        .fetch_one(&mut *conn)
        .await?;
        stored.push(row.into_image());
    }

    Ok(stored)
}

/// PostgreSQL image repository implementation.
#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn find_in_container(
        &self,
        container_id: i64,
        image_id: i64,
    ) -> Result<Option<Image>, AppError> {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, container_id, position, file_name, content_type, size_bytes, created_at
            FROM images
            WHERE container_id = $1 AND id = $2
            "#,
        )
        .bind(container_id)
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_image()))
    }

    async fn count_in_container(&self, container_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM images WHERE container_id = $1",
        )
        .bind(container_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn append(
        &self,
        container_id: i64,
        images: Vec<Image>,
        limit: usize,
    ) -> Result<Vec<Image>, AppError> {
        let mut tx = self.pool.begin().await?;
        let stored = insert_images(&mut tx, container_id, &images, Some(limit)).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn delete(&self, image_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(image_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Image not found".into()));
        }
        Ok(())
    }
}
