//! Tag entity and repository trait.
//!
//! Maps to the `tags` table. Tags are created on demand by the post
//! repository when a post references them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A tag with the number of live posts using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub id: i64,
    pub name: String,
    pub post_count: i64,
}

/// Repository trait for Tag queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Tags whose name starts with `prefix`, alphabetical.
    async fn search_prefix(&self, prefix: String, limit: i64) -> Result<Vec<TagCount>, AppError>;

    /// Tags ordered by number of live posts, descending.
    async fn popular(&self, limit: i64) -> Result<Vec<TagCount>, AppError>;
}
