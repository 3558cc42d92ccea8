//! Who may see a post in full.

use crate::domain::entities::Post;

/// How much of a post a viewer gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAccess {
    Full,
    /// Title, author, tags and image count only
    Preview,
}

/// The caller, as far as post access is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub is_admin: bool,
}

/// Domain service for post visibility.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Decide access given whether the viewer holds active private access to the author.
    pub fn for_post(post: &Post, viewer: Viewer, subscribed_to_author: bool) -> PostAccess {
        if !post.is_private()
            || viewer.is_admin
            || post.is_authored_by(viewer.user_id)
            || subscribed_to_author
        {
            PostAccess::Full
        } else {
            PostAccess::Preview
        }
    }

    /// Whether a viewer may edit the post or its images.
    pub fn can_edit(post: &Post, viewer: Viewer) -> bool {
        post.is_authored_by(viewer.user_id)
    }

    /// Whether a viewer may delete the post.
    pub fn can_delete(post: &Post, viewer: Viewer) -> bool {
        post.is_authored_by(viewer.user_id) || viewer.is_admin
    }
}
