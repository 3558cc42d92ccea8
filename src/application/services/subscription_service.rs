//! Subscription Service
//!
//! Buying and renewing private access to a creator's posts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{
    PrivateAccess, PurchaseReceipt, SubscriptionPurchase, SubscriptionRepository, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Subscription service trait
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Pay the creator's current price for another access period
    async fn subscribe(
        &self,
        subscriber_id: i64,
        creator_id: i64,
    ) -> Result<PurchaseReceipt, SubscriptionError>;

    /// The caller's access row for a creator, active or not
    async fn status(
        &self,
        subscriber_id: i64,
        creator_id: i64,
    ) -> Result<Option<PrivateAccess>, SubscriptionError>;

    async fn list_subscriptions(
        &self,
        subscriber_id: i64,
    ) -> Result<Vec<PrivateAccess>, SubscriptionError>;

    async fn list_subscribers(&self, creator_id: i64)
        -> Result<Vec<PrivateAccess>, SubscriptionError>;
}

/// Subscription service errors
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Creator not found")]
    CreatorNotFound,

    #[error("Cannot subscribe to yourself")]
    SelfSubscription,

    #[error("This creator does not sell private access")]
    NotSelling,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<SubscriptionError> for AppError {
    fn from(e: SubscriptionError) -> Self {
        match e {
            SubscriptionError::CreatorNotFound => AppError::NotFound(e.to_string()),
            SubscriptionError::SelfSubscription => AppError::BadRequest(e.to_string()),
            SubscriptionError::NotSelling => AppError::Conflict(e.to_string()),
            SubscriptionError::Repository(e) => e,
        }
    }
}

/// SubscriptionService implementation
pub struct SubscriptionServiceImpl<S, U>
where
    S: SubscriptionRepository,
    U: UserRepository,
{
    subscription_repo: Arc<S>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
    duration: Duration,
}

impl<S, U> SubscriptionServiceImpl<S, U>
where
    S: SubscriptionRepository,
    U: UserRepository,
{
    pub fn new(
        subscription_repo: Arc<S>,
        user_repo: Arc<U>,
        id_generator: Arc<SnowflakeGenerator>,
        duration_days: i64,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            id_generator,
            duration: Duration::days(duration_days),
        }
    }
}

#[async_trait]
impl<S, U> SubscriptionService for SubscriptionServiceImpl<S, U>
where
    S: SubscriptionRepository + 'static,
    U: UserRepository + 'static,
{
    async fn subscribe(
        &self,
        subscriber_id: i64,
        creator_id: i64,
    ) -> Result<PurchaseReceipt, SubscriptionError> {
        if subscriber_id == creator_id {
            return Err(SubscriptionError::SelfSubscription);
        }

        let creator = self
            .user_repo
            .find_by_id(creator_id)
            .await?
            .ok_or(SubscriptionError::CreatorNotFound)?;
        let price = match creator.subscription_price {
            Some(price) if creator.sells_access() => price,
            _ => return Err(SubscriptionError::NotSelling),
        };

        let receipt = self
            .subscription_repo
            .purchase(&SubscriptionPurchase {
                id: self.id_generator.generate(),
                subscriber_id,
                creator_id,
                price,
                duration: self.duration,
            })
            .await?;

        tracing::info!(
            subscriber_id,
            creator_id,
            amount = price.amount(),
            expires_at = %receipt.access.expires_at,
            "Private access purchased"
        );
        Ok(receipt)
    }

    async fn status(
        &self,
        subscriber_id: i64,
        creator_id: i64,
    ) -> Result<Option<PrivateAccess>, SubscriptionError> {
        Ok(self.subscription_repo.find(subscriber_id, creator_id).await?)
    }

    async fn list_subscriptions(
        &self,
        subscriber_id: i64,
    ) -> Result<Vec<PrivateAccess>, SubscriptionError> {
        Ok(self
            .subscription_repo
            .list_active_for_subscriber(subscriber_id)
            .await?)
    }

    async fn list_subscribers(
        &self,
        creator_id: i64,
    ) -> Result<Vec<PrivateAccess>, SubscriptionError> {
        Ok(self
            .subscription_repo
            .list_active_subscribers(creator_id)
            .await?)
    }
}
