//! Private access (subscription) entity and repository trait.
//!
//! Maps to the `private_access` table. One row per subscriber/creator pair;
//! renewals move `expires_at` forward.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Credits;
use crate::shared::error::AppError;

/// Paid, time-bounded access to a creator's private posts.
///
/// Maps to the `private_access` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - subscriber_id: BIGINT NOT NULL REFERENCES users(id)
/// - creator_id: BIGINT NOT NULL REFERENCES users(id)
/// - price: BIGINT NOT NULL (last price paid)
/// - starts_at: TIMESTAMPTZ NOT NULL
/// - expires_at: TIMESTAMPTZ NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - UNIQUE (subscriber_id, creator_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateAccess {
    pub id: i64,
    pub subscriber_id: i64,
    pub creator_id: i64,
    pub price: Credits,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PrivateAccess {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }
}

/// New expiry after buying `duration` more access.
///
/// Renewing while still active stacks on the current expiry; otherwise the
/// period starts now.
pub fn extended_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    duration: Duration,
) -> DateTime<Utc> {
    let start = match current {
        Some(expires_at) if expires_at > now => expires_at,
        _ => now,
    };
    start + duration
}

/// Input for a purchase, priced at what the buyer was shown.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPurchase {
    /// Id used if no row exists yet for the pair
    pub id: i64,
    pub subscriber_id: i64,
    pub creator_id: i64,
    pub price: Credits,
    pub duration: Duration,
}

/// Outcome of a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub access: PrivateAccess,
    pub subscriber_balance: Credits,
    pub creator_balance: Credits,
}

/// Repository trait for PrivateAccess data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Charge the subscriber, pay the creator and grant or extend access.
    ///
    /// Runs in one transaction. Returns `Conflict` if the creator's price
    /// changed since `purchase.price` was read and `InsufficientFunds` if the
    /// subscriber cannot pay.
    async fn purchase(&self, purchase: &SubscriptionPurchase)
        -> Result<PurchaseReceipt, AppError>;

    /// The access row for a pair, active or not.
    async fn find(
        &self,
        subscriber_id: i64,
        creator_id: i64,
    ) -> Result<Option<PrivateAccess>, AppError>;

    /// Active subscriptions bought by a user.
    async fn list_active_for_subscriber(
        &self,
        subscriber_id: i64,
    ) -> Result<Vec<PrivateAccess>, AppError>;

    /// Active subscribers of a creator.
    async fn list_active_subscribers(&self, creator_id: i64)
        -> Result<Vec<PrivateAccess>, AppError>;
}
