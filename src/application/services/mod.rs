//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, JWT tokens, refresh sessions
//! - **UserService**: Own account and public profiles
//! - **PostService**: Posts, images and private-post access
//! - **TagService**: Tag autocomplete and popularity
//! - **ChatService**: Chat requests, messages and in-chat payments
//! - **WalletService**: Balance, ledger and deposits
//! - **SubscriptionService**: Paid private access
//! - **RatingService**: Ratings after ended chats
//! - **ReportService**: User and post reports
//! - **AdminService**: Moderation and wallet corrections

pub mod admin_service;
pub mod auth_service;
pub mod chat_service;
pub mod media;
pub mod post_service;
pub mod rating_service;
pub mod report_service;
pub mod subscription_service;
pub mod tag_service;
pub mod user_service;
pub mod wallet_service;

pub use admin_service::{AdminError, AdminService, AdminServiceImpl, ReportAction, ReportResolution};
pub use auth_service::{
    decode_access_token, hash_refresh_token, AuthError, AuthService, AuthServiceImpl, AuthTokens,
    Claims,
};
pub use chat_service::{ChatError, ChatLimits, ChatService, ChatServiceImpl, MAX_MESSAGE_LENGTH};
pub use media::ImageUpload;
pub use post_service::{NewPost, PostError, PostService, PostServiceImpl, PostUpdate, PostView};
pub use rating_service::{RatingError, RatingService, RatingServiceImpl};
pub use report_service::{ReportError, ReportService, ReportServiceImpl};
pub use subscription_service::{SubscriptionError, SubscriptionService, SubscriptionServiceImpl};
pub use tag_service::{TagService, TagServiceImpl};
pub use user_service::{UpdateProfile, UserError, UserProfile, UserService, UserServiceImpl};
pub use wallet_service::{WalletError, WalletService, WalletServiceImpl};
