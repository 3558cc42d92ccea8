//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! Each repository owns a clone of the connection pool. Operations that touch
//! several tables (wallet transfers, posts with their images and tags) open
//! their own transaction and share the helpers in `ledger` and
//! `image_repository`.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Accounts, profile updates, bans, admin search
//! - **SessionRepository** - Refresh token sessions
//! - **WalletRepository** - Balances and the transaction ledger
//! - **ImageRepository** - Image metadata inside containers
//! - **PostRepository** - Posts, feed and tag links
//! - **TagRepository** - Tag autocomplete and popularity
//! - **ChatRepository** - Chat requests, messages, in-chat transfers
//! - **SubscriptionRepository** - Paid private access
//! - **ReportRepository** - Moderation reports
//! - **RatingRepository** - Post-chat ratings
//! - **StatsRepository** - Platform counters
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgUserRepository, PgWalletRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let wallet_repo = PgWalletRepository::new(pool.clone());
//! }
//! ```

mod ledger;

pub mod chat_repository;
pub mod image_repository;
pub mod post_repository;
pub mod rating_repository;
pub mod report_repository;
pub mod session_repository;
pub mod stats_repository;
pub mod subscription_repository;
pub mod tag_repository;
pub mod user_repository;
pub mod wallet_repository;

pub use chat_repository::PgChatRepository;
pub use image_repository::PgImageRepository;
pub use post_repository::PgPostRepository;
pub use rating_repository::PgRatingRepository;
pub use report_repository::PgReportRepository;
pub use session_repository::PgSessionRepository;
pub use stats_repository::PgStatsRepository;
pub use subscription_repository::PgSubscriptionRepository;
pub use tag_repository::PgTagRepository;
pub use user_repository::PgUserRepository;
pub use wallet_repository::PgWalletRepository;
