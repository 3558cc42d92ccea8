//! # Domain Entities
//!
//! Core domain entities representing the main business objects of the marketplace.
//! All entities map directly to their corresponding database tables.
//!
//! ## Core Entities
//!
//! - **User**: User account with authentication data, profile and access price
//! - **Post**: A public or private listing with tags and images
//! - **ChatRequest / ChatMessage**: A negotiated conversation between two users
//! - **Wallet**: Credit balance plus its ledger
//! - **PrivateAccess**: A paid subscription to a creator's private posts
//!
//! ## Supporting Entities
//!
//! - **Image**: Content-addressed images grouped in containers
//! - **Tag**: Normalised labels on posts
//! - **Report**: User reports on users or posts
//! - **Rating**: Post-chat scores
//! - **Session**: User sessions for JWT refresh token management
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod chat;
mod image;
mod post;
mod rating;
mod report;
mod session;
mod stats;
mod subscription;
mod tag;
mod user;
mod wallet;

pub use chat::{
    ChatMessage, ChatRepository, ChatRequest, ChatRequestStatus, ChatTransition,
    DeliveredMessage, MessageKind, RequestDirection, TransferReceipt,
};
pub use image::{Image, ImageFormat, ImageRepository, MediaStorage};
pub use post::{Post, PostRepository, PostVisibility, MAX_TAGS_PER_POST};
pub use rating::{Rating, RatingRepository, RatingSummary, MAX_SCORE, MIN_SCORE};
pub use report::{Report, ReportReason, ReportRepository, ReportStatus, ReportTarget};
pub use session::{Session, SessionRepository};
pub use stats::{PlatformStats, StatsRepository};
pub use subscription::{
    extended_expiry, PrivateAccess, PurchaseReceipt, SubscriptionPurchase, SubscriptionRepository,
};
pub use tag::{TagCount, TagRepository};
pub use user::{User, UserRepository, UserRole, UserStats};
pub use wallet::{Wallet, WalletRepository, WalletTransaction, WalletTransactionKind};

#[cfg(test)]
pub use chat::MockChatRepository;
#[cfg(test)]
pub use image::{MockImageRepository, MockMediaStorage};
#[cfg(test)]
pub use post::MockPostRepository;
#[cfg(test)]
pub use rating::MockRatingRepository;
#[cfg(test)]
pub use report::MockReportRepository;
#[cfg(test)]
pub use session::MockSessionRepository;
#[cfg(test)]
pub use stats::MockStatsRepository;
#[cfg(test)]
pub use subscription::MockSubscriptionRepository;
#[cfg(test)]
pub use tag::MockTagRepository;
#[cfg(test)]
pub use user::MockUserRepository;
#[cfg(test)]
pub use wallet::MockWalletRepository;
