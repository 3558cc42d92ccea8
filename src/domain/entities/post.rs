//! Post entity and repository trait.
//!
//! Maps to the `posts` and `post_tags` tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::image::Image;
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

/// Maximum number of tags on a post.
pub const MAX_TAGS_PER_POST: usize = 10;

/// Post visibility matching the `posts.visibility` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostVisibility {
    #[default]
    Public,
    /// Only visible in full to the author's subscribers
    Private,
}

impl PostVisibility {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "private" => Self::Private,
            _ => Self::Public,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for PostVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a post.
///
/// Maps to the `posts` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - author_id: BIGINT NOT NULL REFERENCES users(id)
/// - title: VARCHAR(120) NOT NULL
/// - description: TEXT NOT NULL DEFAULT ''
/// - visibility: TEXT NOT NULL DEFAULT 'public'
/// - container_id: BIGINT NOT NULL REFERENCES image_containers(id)
/// - deleted_at: TIMESTAMPTZ NULL (soft delete)
/// - created_at / updated_at: TIMESTAMPTZ
///
/// `tags` and `images` are loaded from `post_tags` and `images`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Snowflake ID (primary key)
    pub id: i64,

    pub author_id: i64,

    pub title: String,

    pub description: String,

    pub visibility: PostVisibility,

    /// Image container holding this post's images
    pub container_id: i64,

    /// Normalised tag names, sorted
    pub tags: Vec<String>,

    /// Images ordered by position
    pub images: Vec<Image>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_private(&self) -> bool {
        self.visibility == PostVisibility::Private
    }

    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

impl Default for Post {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            author_id: 0,
            title: String::new(),
            description: String::new(),
            visibility: PostVisibility::default(),
            container_id: 0,
            tags: Vec::new(),
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for Post data access operations.
///
/// Soft-deleted posts are never returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Find a live post with its tags and images.
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError>;

    /// Create the image container, the post and its tag links in one transaction.
    async fn create(&self, post: &Post) -> Result<Post, AppError>;

    /// Update title, description, visibility and replace the tag set.
    async fn update(&self, post: &Post) -> Result<Post, AppError>;

    /// Soft delete. Returns false when the post was already gone.
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;

    /// Newest-first feed of posts by non-banned authors, optionally filtered by tag.
    async fn feed(&self, tag: Option<String>, page: Page) -> Result<Vec<Post>, AppError>;

    /// Newest-first posts of one author.
    async fn list_by_author(&self, author_id: i64, page: Page) -> Result<Vec<Post>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_round_trip_strings() {
        assert_eq!(PostVisibility::from_str("private"), PostVisibility::Private);
        assert_eq!(PostVisibility::from_str("PUBLIC"), PostVisibility::Public);
        assert_eq!(PostVisibility::from_str("garbage"), PostVisibility::Public);
        assert_eq!(PostVisibility::Private.to_string(), "private");
    }

    #[test]
    fn test_post_helpers() {
        let post = Post {
            author_id: 7,
            visibility: PostVisibility::Private,
            ..Default::default()
        };
        assert!(post.is_private());
        assert!(post.is_authored_by(7));
        assert!(!post.is_authored_by(8));
    }
}
