//! Response DTOs
//!
//! Data structures for API response bodies and gateway payloads.
//! Snowflake ids are serialized as strings.

use serde::Serialize;

use crate::application::services::{AuthTokens, PostView, UserProfile};
use crate::domain::services::PostAccess;
use crate::domain::{
    ChatMessage, ChatRequest, Image, PlatformStats, PrivateAccess, PurchaseReceipt, Rating,
    Report, TagCount, User, Wallet, WalletTransaction,
};

/// Authentication tokens response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// Registration / login response (includes user and tokens)
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

/// Account view returned to the account owner and admins
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub role: String,
    pub banned: bool,
    pub subscription_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            bio: user.bio,
            role: user.role.as_str().to_string(),
            banned: user.banned,
            subscription_price: user.subscription_price.map(i64::from),
            balance: None,
            created_at: user.created_at.to_rfc3339(),
        }
    }

    pub fn with_wallet(user: User, wallet: &Wallet) -> Self {
        Self {
            balance: Some(wallet.balance.amount()),
            ..Self::from_user(user)
        }
    }
}

/// Public profile
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub subscription_price: Option<i64>,
    pub post_count: i64,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
    pub viewer_has_access: bool,
    pub created_at: String,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        let user = profile.user;
        Self {
            id: user.id.to_string(),
            subscription_price: if user.sells_access() {
                user.subscription_price.map(i64::from)
            } else {
                None
            },
            username: user.username,
            display_name: user.display_name,
            bio: user.bio,
            post_count: profile.stats.post_count,
            rating_average: profile.stats.rating_average,
            rating_count: profile.stats.rating_count,
            viewer_has_access: profile.viewer_has_access,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Stored image with its public URL
#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub id: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub position: i32,
}

impl ImageResponse {
    pub fn from_image(image: Image, public_path: &str) -> Self {
        Self {
            id: image.id.to_string(),
            url: media_url(public_path, &image.file_name),
            content_type: image.content_type,
            size_bytes: image.size_bytes,
            position: image.position,
        }
    }

    pub fn from_images(images: Vec<Image>, public_path: &str) -> Vec<Self> {
        images
            .into_iter()
            .map(|image| Self::from_image(image, public_path))
            .collect()
    }
}

/// Public URL of a stored media file
pub fn media_url(public_path: &str, file_name: &str) -> String {
    format!("{}/{}", public_path.trim_end_matches('/'), file_name)
}

/// Post as seen by the caller. Locked previews carry no description and no
/// image URLs.
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: String,
    pub tags: Vec<String>,
    pub images: Vec<ImageResponse>,
    pub image_count: usize,
    pub locked: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl PostResponse {
    pub fn from_view(view: PostView, public_path: &str) -> Self {
        let post = view.post;
        let image_count = post.images.len();
        let locked = view.access == PostAccess::Preview;
        let (description, images) = if locked {
            (None, Vec::new())
        } else {
            (
                Some(post.description),
                ImageResponse::from_images(post.images, public_path),
            )
        };

        Self {
            id: post.id.to_string(),
            author_id: post.author_id.to_string(),
            title: post.title,
            description,
            visibility: post.visibility.as_str().to_string(),
            tags: post.tags,
            images,
            image_count,
            locked,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

/// Tag with usage count
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub post_count: i64,
}

impl From<TagCount> for TagResponse {
    fn from(tag: TagCount) -> Self {
        Self {
            id: tag.id.to_string(),
            name: tag.name,
            post_count: tag.post_count,
        }
    }
}

/// Chat request response
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequestResponse {
    pub id: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: String,
    pub end_requested_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ChatRequest> for ChatRequestResponse {
    fn from(request: ChatRequest) -> Self {
        Self {
            id: request.id.to_string(),
            requester_id: request.requester_id.to_string(),
            recipient_id: request.recipient_id.to_string(),
            status: request.status.as_str().to_string(),
            end_requested_by: request.end_requested_by.map(|id| id.to_string()),
            created_at: request.created_at.to_rfc3339(),
            updated_at: request.updated_at.to_rfc3339(),
        }
    }
}

/// Chat message response
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageResponse {
    pub id: String,
    pub request_id: String,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Option<String>,
    pub amount: Option<i64>,
    pub images: Vec<ImageResponse>,
    pub delivered_at: Option<String>,
    pub created_at: String,
}

impl ChatMessageResponse {
    pub fn from_message(message: ChatMessage, public_path: &str) -> Self {
        Self {
            id: message.id.to_string(),
            request_id: message.request_id.to_string(),
            sender_id: message.sender_id.to_string(),
            kind: message.kind.as_str().to_string(),
            content: message.content,
            amount: message.amount.map(i64::from),
            images: ImageResponse::from_images(message.images, public_path),
            delivered_at: message.delivered_at.map(|t| t.to_rfc3339()),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Result of an in-chat payment, as seen by the payer
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub message: ChatMessageResponse,
    pub balance: i64,
}

/// Wallet balance
#[derive(Debug, Clone, Serialize)]
pub struct WalletResponse {
    pub user_id: String,
    pub balance: i64,
    pub updated_at: String,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            user_id: wallet.user_id.to_string(),
            balance: wallet.balance.amount(),
            updated_at: wallet.updated_at.to_rfc3339(),
        }
    }
}

/// One ledger entry
#[derive(Debug, Serialize)]
pub struct WalletTransactionResponse {
    pub id: String,
    pub counterparty_id: Option<String>,
    pub amount: i64,
    pub kind: String,
    pub reference_id: Option<String>,
    pub balance_after: i64,
    pub note: Option<String>,
    pub created_at: String,
}

impl From<WalletTransaction> for WalletTransactionResponse {
    fn from(entry: WalletTransaction) -> Self {
        Self {
            id: entry.id.to_string(),
            counterparty_id: entry.counterparty_id.map(|id| id.to_string()),
            amount: entry.amount,
            kind: entry.kind.as_str().to_string(),
            reference_id: entry.reference_id.map(|id| id.to_string()),
            balance_after: entry.balance_after.amount(),
            note: entry.note,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Private access row
#[derive(Debug, Serialize)]
pub struct PrivateAccessResponse {
    pub id: String,
    pub subscriber_id: String,
    pub creator_id: String,
    pub price: i64,
    pub starts_at: String,
    pub expires_at: String,
    pub active: bool,
}

impl From<PrivateAccess> for PrivateAccessResponse {
    fn from(access: PrivateAccess) -> Self {
        Self {
            active: access.is_active(),
            id: access.id.to_string(),
            subscriber_id: access.subscriber_id.to_string(),
            creator_id: access.creator_id.to_string(),
            price: access.price.amount(),
            starts_at: access.starts_at.to_rfc3339(),
            expires_at: access.expires_at.to_rfc3339(),
        }
    }
}

/// Subscription status for one creator
#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub creator_id: String,
    pub active: bool,
    pub access: Option<PrivateAccessResponse>,
}

/// Purchase result, as seen by the subscriber
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub access: PrivateAccessResponse,
    pub balance: i64,
}

impl From<PurchaseReceipt> for PurchaseResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            balance: receipt.subscriber_balance.amount(),
            access: receipt.access.into(),
        }
    }
}

/// Report response
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub target_type: String,
    pub target_id: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub resolved_by: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            id: report.id.to_string(),
            reporter_id: report.reporter_id.to_string(),
            target_type: report.target.type_str().to_string(),
            target_id: report.target.id().to_string(),
            reason: report.reason.as_str().to_string(),
            description: report.description,
            status: report.status.as_str().to_string(),
            resolved_by: report.resolved_by.map(|id| id.to_string()),
            resolution_note: report.resolution_note,
            created_at: report.created_at.to_rfc3339(),
            resolved_at: report.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Rating response
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: String,
    pub request_id: String,
    pub rater_id: String,
    pub ratee_id: String,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: String,
}

impl From<Rating> for RatingResponse {
    fn from(rating: Rating) -> Self {
        Self {
            id: rating.id.to_string(),
            request_id: rating.request_id.to_string(),
            rater_id: rating.rater_id.to_string(),
            ratee_id: rating.ratee_id.to_string(),
            score: rating.score,
            comment: rating.comment,
            created_at: rating.created_at.to_rfc3339(),
        }
    }
}

/// Admin dashboard counters
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub banned_users: i64,
    pub live_posts: i64,
    pub pending_reports: i64,
    pub open_chat_requests: i64,
    pub credits_in_circulation: i64,
}

impl From<PlatformStats> for StatsResponse {
    fn from(stats: PlatformStats) -> Self {
        Self {
            users: stats.users,
            banned_users: stats.banned_users,
            live_posts: stats.live_posts,
            pending_reports: stats.pending_reports,
            open_chat_requests: stats.open_chat_requests,
            credits_in_circulation: stats.credits_in_circulation.amount(),
        }
    }
}
