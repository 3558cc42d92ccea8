//! Post Service
//!
//! Post CRUD, image attachments, feed and private-post access.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::media::{store_uploads, ImageUpload};
use crate::config::MediaSettings;
use crate::domain::services::{AccessPolicy, PostAccess, Viewer};
use crate::domain::{
    ImageRepository, MediaStorage, Post, PostRepository, PostVisibility, SubscriptionRepository,
    TagName, MAX_TAGS_PER_POST,
};
use crate::shared::error::AppError;
use crate::shared::pagination::Page;
use crate::shared::snowflake::SnowflakeGenerator;

/// Post service trait
#[async_trait]
pub trait PostService: Send + Sync {
    async fn create(&self, author_id: i64, post: NewPost) -> Result<Post, PostError>;

    async fn get(&self, viewer: Viewer, post_id: i64) -> Result<PostView, PostError>;

    /// Author-only update
    async fn update(&self, viewer: Viewer, post_id: i64, update: PostUpdate)
        -> Result<Post, PostError>;

    /// Author or admin soft delete
    async fn delete(&self, viewer: Viewer, post_id: i64) -> Result<(), PostError>;

    async fn feed(
        &self,
        viewer: Viewer,
        tag: Option<String>,
        page: Page,
    ) -> Result<Vec<PostView>, PostError>;

    async fn list_by_author(
        &self,
        viewer: Viewer,
        author_id: i64,
        page: Page,
    ) -> Result<Vec<PostView>, PostError>;

    async fn add_images(
        &self,
        viewer: Viewer,
        post_id: i64,
        uploads: Vec<ImageUpload>,
    ) -> Result<Post, PostError>;

    async fn remove_image(
        &self,
        viewer: Viewer,
        post_id: i64,
        image_id: i64,
    ) -> Result<Post, PostError>;
}

/// Create post input (already length-validated)
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub visibility: PostVisibility,
    pub tags: Vec<String>,
}

/// Partial post update
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<PostVisibility>,
    pub tags: Option<Vec<String>>,
}

/// A post with the access level of the viewer
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub access: PostAccess,
}

/// Post service errors
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("Post not found")]
    NotFound,

    #[error("Only the author can modify this post")]
    NotAuthor,

    #[error("A post can have at most {0} tags")]
    TooManyTags(usize),

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("A post can have at most {0} images")]
    TooManyImages(usize),

    #[error("No files uploaded")]
    NoFiles,

    #[error("Image not found")]
    ImageNotFound,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<PostError> for AppError {
    fn from(e: PostError) -> Self {
        match e {
            PostError::NotFound => AppError::NotFound("Post not found".into()),
            PostError::ImageNotFound => AppError::NotFound("Image not found".into()),
            PostError::NotAuthor => AppError::Forbidden(e.to_string()),
            e @ (PostError::TooManyTags(_) | PostError::InvalidTag(_)) => {
                AppError::invalid_field("tags", e.to_string())
            }
            e @ (PostError::TooManyImages(_) | PostError::NoFiles) => {
                AppError::BadRequest(e.to_string())
            }
            PostError::Repository(e) => e,
        }
    }
}

/// Normalise, de-duplicate and sort tags.
pub fn normalize_tags(raw: &[String]) -> Result<Vec<String>, PostError> {
    let mut tags = BTreeSet::new();
    for value in raw {
        let tag = TagName::parse(value).ok_or_else(|| PostError::InvalidTag(value.clone()))?;
        tags.insert(tag.into_inner());
    }
    if tags.len() > MAX_TAGS_PER_POST {
        return Err(PostError::TooManyTags(MAX_TAGS_PER_POST));
    }
    Ok(tags.into_iter().collect())
}

/// PostService implementation
pub struct PostServiceImpl<P, I, S, M>
where
    P: PostRepository,
    I: ImageRepository,
    S: SubscriptionRepository,
    M: MediaStorage,
{
    post_repo: Arc<P>,
    image_repo: Arc<I>,
    subscription_repo: Arc<S>,
    storage: Arc<M>,
    id_generator: Arc<SnowflakeGenerator>,
    media: MediaSettings,
}

impl<P, I, S, M> PostServiceImpl<P, I, S, M>
where
    P: PostRepository,
    I: ImageRepository,
    S: SubscriptionRepository,
    M: MediaStorage,
{
    pub fn new(
        post_repo: Arc<P>,
        image_repo: Arc<I>,
        subscription_repo: Arc<S>,
        storage: Arc<M>,
        id_generator: Arc<SnowflakeGenerator>,
        media: MediaSettings,
    ) -> Self {
        Self {
            post_repo,
            image_repo,
            subscription_repo,
            storage,
            id_generator,
            media,
        }
    }

    async fn find_post(&self, post_id: i64) -> Result<Post, PostError> {
        self.post_repo
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound)
    }

    async fn find_editable(&self, viewer: Viewer, post_id: i64) -> Result<Post, PostError> {
        let post = self.find_post(post_id).await?;
        if !AccessPolicy::can_edit(&post, viewer) {
            return Err(PostError::NotAuthor);
        }
        Ok(post)
    }

    /// Apply access to a list, looking up the viewer's subscriptions once.
    async fn with_access(&self, viewer: Viewer, posts: Vec<Post>) -> Result<Vec<PostView>, PostError> {
        let needs_lookup = posts
            .iter()
            .any(|p| p.is_private() && !p.is_authored_by(viewer.user_id));

        let subscribed: HashSet<i64> = if needs_lookup && !viewer.is_admin {
            self.subscription_repo
                .list_active_for_subscriber(viewer.user_id)
                .await?
                .into_iter()
                .map(|access| access.creator_id)
                .collect()
        } else {
            HashSet::new()
        };

        Ok(posts
            .into_iter()
            .map(|post| {
                let access =
                    AccessPolicy::for_post(&post, viewer, subscribed.contains(&post.author_id));
                PostView { post, access }
            })
            .collect())
    }
}

#[async_trait]
impl<P, I, S, M> PostService for PostServiceImpl<P, I, S, M>
where
    P: PostRepository + 'static,
    I: ImageRepository + 'static,
    S: SubscriptionRepository + 'static,
    M: MediaStorage + 'static,
{
    async fn create(&self, author_id: i64, new_post: NewPost) -> Result<Post, PostError> {
        let tags = normalize_tags(&new_post.tags)?;
        let now = Utc::now();
        let post = Post {
            id: self.id_generator.generate(),
            author_id,
            title: new_post.title.trim().to_string(),
            description: new_post.description.trim().to_string(),
            visibility: new_post.visibility,
            container_id: self.id_generator.generate(),
            tags,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let created = self.post_repo.create(&post).await?;
        tracing::info!(post_id = created.id, author_id, visibility = %created.visibility, "Post created");
        Ok(created)
    }

    async fn get(&self, viewer: Viewer, post_id: i64) -> Result<PostView, PostError> {
        let post = self.find_post(post_id).await?;

        let subscribed = if post.is_private() && !post.is_authored_by(viewer.user_id) && !viewer.is_admin {
            self.subscription_repo
                .find(viewer.user_id, post.author_id)
                .await?
                .is_some_and(|access| access.is_active())
        } else {
            false
        };

        let access = AccessPolicy::for_post(&post, viewer, subscribed);
        Ok(PostView { post, access })
    }

    async fn update(
        &self,
        viewer: Viewer,
        post_id: i64,
        update: PostUpdate,
    ) -> Result<Post, PostError> {
        let mut post = self.find_editable(viewer, post_id).await?;

        if let Some(title) = update.title {
            post.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            post.description = description.trim().to_string();
        }
        if let Some(visibility) = update.visibility {
            post.visibility = visibility;
        }
        if let Some(tags) = update.tags {
            post.tags = normalize_tags(&tags)?;
        }
        post.updated_at = Utc::now();

        Ok(self.post_repo.update(&post).await?)
    }

    async fn delete(&self, viewer: Viewer, post_id: i64) -> Result<(), PostError> {
        let post = self.find_post(post_id).await?;
        if !AccessPolicy::can_delete(&post, viewer) {
            return Err(PostError::NotAuthor);
        }

        if !self.post_repo.soft_delete(post_id).await? {
            return Err(PostError::NotFound);
        }
        tracing::info!(post_id, deleted_by = viewer.user_id, "Post deleted");
        Ok(())
    }

    async fn feed(
        &self,
        viewer: Viewer,
        tag: Option<String>,
        page: Page,
    ) -> Result<Vec<PostView>, PostError> {
        let tag = match tag.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                TagName::parse(raw)
                    .ok_or_else(|| PostError::InvalidTag(raw.to_string()))?
                    .into_inner(),
            ),
        };

        let posts = self.post_repo.feed(tag, page).await?;
        self.with_access(viewer, posts).await
    }

    async fn list_by_author(
        &self,
        viewer: Viewer,
        author_id: i64,
        page: Page,
    ) -> Result<Vec<PostView>, PostError> {
        let posts = self.post_repo.list_by_author(author_id, page).await?;
        self.with_access(viewer, posts).await
    }

    async fn add_images(
        &self,
        viewer: Viewer,
        post_id: i64,
        uploads: Vec<ImageUpload>,
    ) -> Result<Post, PostError> {
        if uploads.is_empty() {
            return Err(PostError::NoFiles);
        }
        let post = self.find_editable(viewer, post_id).await?;

        // Early reject before storing files; `append` re-checks under the container lock
        let existing = self.image_repo.count_in_container(post.container_id).await?;
        let limit = self.media.max_images_per_container;
        if existing as usize + uploads.len() > limit {
            return Err(PostError::TooManyImages(limit));
        }

        let images = store_uploads(
            self.storage.as_ref(),
            &self.id_generator,
            &self.media,
            post.container_id,
            existing as i32,
            uploads,
        )
        .await?;
        let added = self
            .image_repo
            .append(post.container_id, images, limit)
            .await?;
        tracing::debug!(post_id, count = added.len(), "Images added to post");

        self.find_post(post_id).await
    }

    async fn remove_image(
        &self,
        viewer: Viewer,
        post_id: i64,
        image_id: i64,
    ) -> Result<Post, PostError> {
        let post = self.find_editable(viewer, post_id).await?;

        self.image_repo
            .find_in_container(post.container_id, image_id)
            .await?
            .ok_or(PostError::ImageNotFound)?;
        self.image_repo.delete(image_id).await?;

        self.find_post(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::media::fixtures::PNG;
    use super::*;
    use crate::domain::{
        Credits, MockImageRepository, MockMediaStorage, MockPostRepository,
        MockSubscriptionRepository, PrivateAccess,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    const AUTHOR: i64 = 10;
    const STRANGER: i64 = 20;

    fn viewer(user_id: i64) -> Viewer {
        Viewer {
            user_id,
            is_admin: false,
        }
    }

    fn post(id: i64, author_id: i64, visibility: PostVisibility) -> Post {
        Post {
            id,
            author_id,
            title: format!("post {}", id),
            visibility,
            container_id: id + 1000,
            ..Default::default()
        }
    }

    fn media() -> MediaSettings {
        MediaSettings {
            root: "/tmp/media".into(),
            public_path: "/media".into(),
            max_image_bytes: 1024,
            max_images_per_container: 2,
        }
    }

    fn service(
        posts: MockPostRepository,
        images: MockImageRepository,
        subs: MockSubscriptionRepository,
        storage: MockMediaStorage,
    ) -> PostServiceImpl<MockPostRepository, MockImageRepository, MockSubscriptionRepository, MockMediaStorage>
    {
        PostServiceImpl::new(
            Arc::new(posts),
            Arc::new(images),
            Arc::new(subs),
            Arc::new(storage),
            Arc::new(SnowflakeGenerator::new(1, 1)),
            media(),
        )
    }

    fn active_access(creator_id: i64) -> PrivateAccess {
        let now = Utc::now();
        PrivateAccess {
            id: 1,
            subscriber_id: STRANGER,
            creator_id,
            price: Credits::new(10),
            starts_at: now,
            expires_at: now + Duration::days(3),
            created_at: now,
        }
    }

    #[test]
    fn test_normalize_tags_dedupes_and_sorts() {
        let tags = normalize_tags(&["Art".into(), " art ".into(), "#Digital Art".into()]).unwrap();
        assert_eq!(tags, vec!["art".to_string(), "digital-art".to_string()]);
    }

    #[test]
    fn test_normalize_tags_limits() {
        let many: Vec<String> = (0..11).map(|i| format!("tag{}", i)).collect();
        assert!(matches!(normalize_tags(&many), Err(PostError::TooManyTags(_))));
        assert!(matches!(normalize_tags(&["!!!".into()]), Err(PostError::InvalidTag(_))));
    }

    #[tokio::test]
    async fn test_create_normalizes_tags() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_create()
            .withf(|p| p.author_id == AUTHOR && p.tags == vec!["rust".to_string()] && p.title == "Hello")
            .returning(|p| Ok(p.clone()));

        let created = service(posts, MockImageRepository::new(), MockSubscriptionRepository::new(), MockMediaStorage::new())
            .create(
                AUTHOR,
                NewPost {
                    title: " Hello ".into(),
                    tags: vec!["Rust".into(), "rust".into()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(created.id, created.container_id);
    }

    #[tokio::test]
    async fn test_private_post_preview_for_stranger() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(|id| Ok(Some(post(id, AUTHOR, PostVisibility::Private))));
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find().returning(|_, _| Ok(None));

        let view = service(posts, MockImageRepository::new(), subs, MockMediaStorage::new())
            .get(viewer(STRANGER), 1)
            .await
            .unwrap();
        assert_eq!(view.access, PostAccess::Preview);
    }

    #[tokio::test]
    async fn test_feed_applies_subscriptions_once() {
        let mut posts = MockPostRepository::new();
        posts.expect_feed().returning(|_, _| {
            Ok(vec![
                post(3, AUTHOR, PostVisibility::Private),
                post(2, 99, PostVisibility::Private),
                post(1, 99, PostVisibility::Public),
            ])
        });
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_list_active_for_subscriber()
            .times(1)
            .returning(|_| Ok(vec![active_access(AUTHOR)]));

        let views = service(posts, MockImageRepository::new(), subs, MockMediaStorage::new())
            .feed(viewer(STRANGER), None, Page::default())
            .await
            .unwrap();

        let access: Vec<PostAccess> = views.iter().map(|v| v.access).collect();
        assert_eq!(access, vec![PostAccess::Full, PostAccess::Preview, PostAccess::Full]);
    }

    #[tokio::test]
    async fn test_feed_rejects_bad_tag() {
        let err = service(
            MockPostRepository::new(),
            MockImageRepository::new(),
            MockSubscriptionRepository::new(),
            MockMediaStorage::new(),
        )
        .feed(viewer(STRANGER), Some("???".into()), Page::default())
        .await
        .unwrap_err();
        assert!(matches!(err, PostError::InvalidTag(_)));
    }

    #[tokio::test]
    async fn test_update_by_non_author_forbidden() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(|id| Ok(Some(post(id, AUTHOR, PostVisibility::Public))));
        posts.expect_update().never();

        let err = service(posts, MockImageRepository::new(), MockSubscriptionRepository::new(), MockMediaStorage::new())
            .update(viewer(STRANGER), 1, PostUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_admin_can_delete() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(|id| Ok(Some(post(id, AUTHOR, PostVisibility::Public))));
        posts.expect_soft_delete().times(1).returning(|_| Ok(true));

        let admin = Viewer {
            user_id: STRANGER,
            is_admin: true,
        };
        service(posts, MockImageRepository::new(), MockSubscriptionRepository::new(), MockMediaStorage::new())
            .delete(admin, 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_images_respects_container_limit() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(|id| Ok(Some(post(id, AUTHOR, PostVisibility::Public))));
        let mut images = MockImageRepository::new();
        images.expect_count_in_container().returning(|_| Ok(1));
        images.expect_append().never();
        let mut storage = MockMediaStorage::new();
        storage.expect_store().never();

        let err = service(posts, images, MockSubscriptionRepository::new(), storage)
            .add_images(viewer(AUTHOR), 1, vec![ImageUpload::new(PNG), ImageUpload::new(PNG)])
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::TooManyImages(2)));
    }

    #[tokio::test]
    async fn test_add_images_appends_after_existing() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(|id| Ok(Some(post(id, AUTHOR, PostVisibility::Public))));
        let mut images = MockImageRepository::new();
        images.expect_count_in_container().returning(|_| Ok(1));
        images
            .expect_append()
            .withf(|container_id, imgs, limit| {
                *container_id == 1001 && imgs.len() == 1 && imgs[0].position == 1 && *limit == 2
            })
            .times(1)
            .returning(|_, imgs, _| Ok(imgs));
        let mut storage = MockMediaStorage::new();
        storage
            .expect_store()
            .returning(|_, _| Ok("deadbeef.png".into()));

        service(posts, images, MockSubscriptionRepository::new(), storage)
            .add_images(viewer(AUTHOR), 1, vec![ImageUpload::new(PNG)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_images_surfaces_locked_capacity_check() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(|id| Ok(Some(post(id, AUTHOR, PostVisibility::Public))));
        let mut images = MockImageRepository::new();
        // A concurrent upload filled the container after the early count
        images.expect_count_in_container().returning(|_| Ok(1));
        images.expect_append().times(1).returning(|_, _, limit| {
            Err(AppError::BadRequest(format!(
                "A container can hold at most {} images",
                limit
            )))
        });
        let mut storage = MockMediaStorage::new();
        storage
            .expect_store()
            .returning(|_, _| Ok("deadbeef.png".into()));

        let err = service(posts, images, MockSubscriptionRepository::new(), storage)
            .add_images(viewer(AUTHOR), 1, vec![ImageUpload::new(PNG)])
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }
}
