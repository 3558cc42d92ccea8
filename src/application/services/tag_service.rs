//! Tag Service
//!
//! Tag autocomplete and popularity.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{TagCount, TagName, TagRepository};
use crate::shared::error::AppError;

const DEFAULT_TAG_LIMIT: i64 = 20;
const MAX_TAG_LIMIT: i64 = 50;

/// Tag service trait
#[async_trait]
pub trait TagService: Send + Sync {
    /// Tags starting with the normalised prefix. An empty prefix matches nothing.
    async fn search(&self, prefix: &str, limit: Option<i64>) -> Result<Vec<TagCount>, AppError>;

    async fn popular(&self, limit: Option<i64>) -> Result<Vec<TagCount>, AppError>;
}

/// TagService implementation
pub struct TagServiceImpl<T>
where
    T: TagRepository,
{
    tag_repo: Arc<T>,
}

impl<T> TagServiceImpl<T>
where
    T: TagRepository,
{
    pub fn new(tag_repo: Arc<T>) -> Self {
        Self { tag_repo }
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_TAG_LIMIT).clamp(1, MAX_TAG_LIMIT)
}

#[async_trait]
impl<T> TagService for TagServiceImpl<T>
where
    T: TagRepository + 'static,
{
    async fn search(&self, prefix: &str, limit: Option<i64>) -> Result<Vec<TagCount>, AppError> {
        let prefix = TagName::normalize_prefix(prefix);
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        self.tag_repo.search_prefix(prefix, clamp_limit(limit)).await
    }

    async fn popular(&self, limit: Option<i64>) -> Result<Vec<TagCount>, AppError> {
        self.tag_repo.popular(clamp_limit(limit)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockTagRepository;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_search_normalizes_prefix_and_clamps() {
        let mut tags = MockTagRepository::new();
        tags.expect_search_prefix()
            .with(eq("digital-a".to_string()), eq(MAX_TAG_LIMIT))
            .times(1)
            .returning(|_, _| {
                Ok(vec![TagCount {
                    id: 1,
                    name: "digital-art".into(),
                    post_count: 4,
                }])
            });

        let found = TagServiceImpl::new(Arc::new(tags))
            .search(" #Digital A", Some(500))
            .await
            .unwrap();
        assert_eq!(found[0].name, "digital-art");
    }

    #[tokio::test]
    async fn test_empty_prefix_skips_query() {
        let mut tags = MockTagRepository::new();
        tags.expect_search_prefix().never();

        let found = TagServiceImpl::new(Arc::new(tags)).search("  ", None).await.unwrap();
        assert!(found.is_empty());
    }
}
