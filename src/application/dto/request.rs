//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::application::services::{NewPost, PostUpdate, ReportAction, UpdateProfile};
use crate::domain::{PostVisibility, ReportReason};
use crate::shared::pagination::CursorQuery;

/// Distinguishes an explicit `null` from a missing field in PATCH bodies.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Refresh / logout request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Update own profile. `null` clears a field, absence leaves it unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "deserialize_some")]
    #[validate(length(min = 1, max = 64, message = "Display name must be 1-64 characters"))]
    pub display_name: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub subscription_price: Option<Option<i64>>,
}

impl From<UpdateProfileRequest> for UpdateProfile {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            display_name: req.display_name,
            bio: req.bio,
            subscription_price: req.subscription_price,
        }
    }
}

/// Create post request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 120, message = "Title must be 1-120 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,

    #[serde(default)]
    pub visibility: PostVisibility,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CreatePostRequest> for NewPost {
    fn from(req: CreatePostRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            description: req.description,
            visibility: req.visibility,
            tags: req.tags,
        }
    }
}

/// Update post request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 120, message = "Title must be 1-120 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub visibility: Option<PostVisibility>,

    pub tags: Option<Vec<String>>,
}

impl From<UpdatePostRequest> for PostUpdate {
    fn from(req: UpdatePostRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            visibility: req.visibility,
            tags: req.tags,
        }
    }
}

/// Feed query parameters
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub tag: Option<String>,
    pub before: Option<String>,
    pub limit: Option<i64>,
}

impl FeedQuery {
    pub fn cursor(&self) -> CursorQuery {
        CursorQuery {
            before: self.before.clone(),
            limit: self.limit,
        }
    }
}

/// Tag search query parameters
#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    #[serde(default)]
    pub prefix: String,
    pub limit: Option<i64>,
}

/// Limit-only query parameters
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Open a chat request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatRequest {
    pub recipient_id: String,

    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub message: String,
}

/// Chat request list query
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequestQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    pub before: Option<String>,
    pub limit: Option<i64>,
}

impl ChatRequestQuery {
    pub fn cursor(&self) -> CursorQuery {
        CursorQuery {
            before: self.before.clone(),
            limit: self.limit,
        }
    }
}

/// Text message
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,
}

/// In-chat payment
#[derive(Debug, Deserialize, Validate)]
pub struct TransactionRequest {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
}

/// Rate the other participant of an ended chat
#[derive(Debug, Deserialize, Validate)]
pub struct RateRequest {
    #[validate(range(min = 1, max = 5, message = "Score must be between 1 and 5"))]
    pub score: i16,

    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
}

/// Wallet deposit
#[derive(Debug, Deserialize, Validate)]
pub struct DepositRequest {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
}

/// Report a user or a post
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub reason: ReportReason,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Admin user search
#[derive(Debug, Default, Deserialize)]
pub struct AdminUserQuery {
    pub query: Option<String>,
    pub before: Option<String>,
    pub limit: Option<i64>,
}

impl AdminUserQuery {
    pub fn cursor(&self) -> CursorQuery {
        CursorQuery {
            before: self.before.clone(),
            limit: self.limit,
        }
    }
}

/// Admin report list
#[derive(Debug, Default, Deserialize)]
pub struct AdminReportQuery {
    pub status: Option<String>,
    pub before: Option<String>,
    pub limit: Option<i64>,
}

impl AdminReportQuery {
    pub fn cursor(&self) -> CursorQuery {
        CursorQuery {
            before: self.before.clone(),
            limit: self.limit,
        }
    }
}

/// Close a report
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveReportRequest {
    pub status: String,

    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,

    #[serde(default)]
    pub action: ReportAction,
}

/// Admin wallet correction
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustWalletRequest {
    pub amount: i64,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}
