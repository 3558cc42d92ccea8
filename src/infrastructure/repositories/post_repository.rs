//! Post Repository Implementation
//!
//! Posts are soft deleted. Tags and images are loaded in batch for every
//! page of posts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::image_repository::{create_container, load_images};
use crate::domain::{Post, PostRepository, PostVisibility};
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    author_id: i64,
    title: String,
    description: String,
    visibility: String,
    container_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self) -> Post {
        Post {
            id: self.id,
            author_id: self.author_id,
            title: self.title,
            description: self.description,
            visibility: PostVisibility::from_str(&self.visibility),
            container_id: self.container_id,
            tags: Vec::new(),
            images: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Replace the tag links of a post, creating missing tags.
async fn set_tags(conn: &mut PgConnection, post_id: i64, tags: &[String]) -> Result<(), AppError> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO tags (name)
        SELECT UNNEST($1::varchar[])
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(tags)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO post_tags (post_id, tag_id)
        SELECT $1, id FROM tags WHERE name = ANY($2)
        "#,
    )
    .bind(post_id)
    .bind(tags)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// PostgreSQL post repository implementation.
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach tags and images to a batch of rows, keeping row order.
    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<Post>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let container_ids: Vec<i64> = rows.iter().map(|r| r.container_id).collect();

        let tag_rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT pt.post_id, t.name
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
        for (post_id, name) in tag_rows {
            tags.entry(post_id).or_default().push(name);
        }
        let mut images = load_images(&self.pool, &container_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut post = row.into_post();
                post.tags = tags.remove(&post.id).unwrap_or_default();
                post.images = images.remove(&post.container_id).unwrap_or_default();
                post
            })
            .collect())
    }

    async fn find_live(&self, id: i64) -> Result<Option<Post>, AppError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, author_id, title, description, visibility, container_id, created_at, updated_at
            FROM posts
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError> {
        self.find_live(id).await
    }

    async fn create(&self, post: &Post) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        create_container(&mut tx, post.container_id, post.author_id).await?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, title, description, visibility, container_id,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.visibility.as_str())
        .bind(post.container_id)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await?;

        set_tags(&mut tx, post.id, &post.tags).await?;
        tx.commit().await?;

        self.find_live(post.id)
            .await?
            .ok_or_else(|| AppError::Internal("Created post vanished".into()))
    }

    async fn update(&self, post: &Post) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2, description = $3, visibility = $4, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.visibility.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post with id {} not found", post.id)));
        }

        set_tags(&mut tx, post.id, &post.tags).await?;
        tx.commit().await?;

        self.find_live(post.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post with id {} not found", post.id)))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn feed(&self, tag: Option<String>, page: Page) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.author_id, p.title, p.description, p.visibility, p.container_id,
                   p.created_at, p.updated_at
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.deleted_at IS NULL
              AND NOT u.banned
              AND p.id < $1
              AND ($2::text IS NULL OR EXISTS (
                    SELECT 1 FROM post_tags pt
                    JOIN tags t ON t.id = pt.tag_id
                    WHERE pt.post_id = p.id AND t.name = $2))
            ORDER BY p.id DESC
            LIMIT $3
            "#,
        )
        .bind(page.before_or_max())
        .bind(tag)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_by_author(&self, author_id: i64, page: Page) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, author_id, title, description, visibility, container_id, created_at, updated_at
            FROM posts
            WHERE author_id = $1 AND deleted_at IS NULL AND id < $2
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(author_id)
        .bind(page.before_or_max())
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }
}
