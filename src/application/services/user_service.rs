//! User Service
//!
//! Own account, profile updates and public profiles.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Credits, SubscriptionRepository, User, UserRepository, UserStats, Wallet, WalletRepository,
};
use crate::shared::error::AppError;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// The caller's account together with their wallet
    async fn get_me(&self, user_id: i64) -> Result<(User, Wallet), UserError>;

    /// Update profile fields; absent fields are left untouched
    async fn update_profile(&self, user_id: i64, update: UpdateProfile)
        -> Result<User, UserError>;

    /// Public profile as seen by `viewer_id`
    async fn get_profile(&self, viewer_id: i64, user_id: i64) -> Result<UserProfile, UserError>;
}

/// Profile changes. The outer `Option` is "field present", the inner one
/// allows clearing a value with `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateProfile {
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub subscription_price: Option<Option<i64>>,
}

/// Public profile data
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub stats: UserStats,
    /// Viewer holds active private access (or is the user)
    pub viewer_has_access: bool,
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Wallet not found")]
    WalletNotFound,

    #[error("Subscription price must be between 1 and {0}")]
    InvalidPrice(i64),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound => AppError::NotFound("User not found".into()),
            UserError::WalletNotFound => AppError::Internal("Wallet missing for user".into()),
            e @ UserError::InvalidPrice(_) => {
                AppError::invalid_field("subscription_price", e.to_string())
            }
            UserError::Repository(e) => e,
        }
    }
}

/// UserService implementation
pub struct UserServiceImpl<U, W, S>
where
    U: UserRepository,
    W: WalletRepository,
    S: SubscriptionRepository,
{
    user_repo: Arc<U>,
    wallet_repo: Arc<W>,
    subscription_repo: Arc<S>,
    max_price: i64,
}

impl<U, W, S> UserServiceImpl<U, W, S>
where
    U: UserRepository,
    W: WalletRepository,
    S: SubscriptionRepository,
{
    pub fn new(user_repo: Arc<U>, wallet_repo: Arc<W>, subscription_repo: Arc<S>, max_price: i64) -> Self {
        Self {
            user_repo,
            wallet_repo,
            subscription_repo,
            max_price,
        }
    }

    async fn find_user(&self, user_id: i64) -> Result<User, UserError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound)
    }
}

/// Trim and turn blank strings into `None`.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<U, W, S> UserService for UserServiceImpl<U, W, S>
where
    U: UserRepository + 'static,
    W: WalletRepository + 'static,
    S: SubscriptionRepository + 'static,
{
    async fn get_me(&self, user_id: i64) -> Result<(User, Wallet), UserError> {
        let user = self.find_user(user_id).await?;
        let wallet = self
            .wallet_repo
            .find_by_user(user_id)
            .await?
            .ok_or(UserError::WalletNotFound)?;
        Ok((user, wallet))
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: UpdateProfile,
    ) -> Result<User, UserError> {
        let mut user = self.find_user(user_id).await?;

        if let Some(display_name) = update.display_name {
            user.display_name = clean(display_name);
        }
        if let Some(bio) = update.bio {
            user.bio = clean(bio);
        }
        if let Some(price) = update.subscription_price {
            user.subscription_price = match price {
                None => None,
                Some(p) if p >= 1 && p <= self.max_price => Some(Credits::new(p)),
                Some(_) => return Err(UserError::InvalidPrice(self.max_price)),
            };
        }
        user.updated_at = Utc::now();

        let updated = self.user_repo.update_profile(&user).await?;
        tracing::debug!(user_id, "Profile updated");
        Ok(updated)
    }

    async fn get_profile(&self, viewer_id: i64, user_id: i64) -> Result<UserProfile, UserError> {
        let user = self.find_user(user_id).await?;
        let stats = self.user_repo.stats(user_id).await?;

        let viewer_has_access = if viewer_id == user_id {
            true
        } else {
            self.subscription_repo
                .find(viewer_id, user_id)
                .await?
                .is_some_and(|access| access.is_active())
        };

        Ok(UserProfile {
            user,
            stats,
            viewer_has_access,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MockSubscriptionRepository, MockUserRepository, MockWalletRepository, PrivateAccess,
    };
    use chrono::Duration;
    use mockall::predicate::*;

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{}", id),
            ..Default::default()
        }
    }

    fn service(
        users: MockUserRepository,
        wallets: MockWalletRepository,
        subs: MockSubscriptionRepository,
    ) -> UserServiceImpl<MockUserRepository, MockWalletRepository, MockSubscriptionRepository> {
        UserServiceImpl::new(Arc::new(users), Arc::new(wallets), Arc::new(subs), 10_000)
    }

    #[tokio::test]
    async fn test_update_profile_sets_and_clears_fields() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            let mut u = user(id);
            u.bio = Some("old bio".into());
            Ok(Some(u))
        });
        users
            .expect_update_profile()
            .withf(|u| {
                u.display_name.as_deref() == Some("Shop")
                    && u.bio.is_none()
                    && u.subscription_price == Some(Credits::new(300))
            })
            .times(1)
            .returning(|u| Ok(u.clone()));

        let update = UpdateProfile {
            display_name: Some(Some("  Shop ".into())),
            bio: Some(None),
            subscription_price: Some(Some(300)),
        };
        let updated = service(users, MockWalletRepository::new(), MockSubscriptionRepository::new())
            .update_profile(1, update)
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Shop"));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_price_over_max() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        users.expect_update_profile().never();

        let update = UpdateProfile {
            subscription_price: Some(Some(10_001)),
            ..Default::default()
        };
        let err = service(users, MockWalletRepository::new(), MockSubscriptionRepository::new())
            .update_profile(1, update)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_profile_reports_active_access() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        users.expect_stats().returning(|_| {
            Ok(UserStats {
                post_count: 3,
                rating_average: Some(4.5),
                rating_count: 2,
            })
        });

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find().with(eq(1), eq(2)).returning(|s, c| {
            let now = Utc::now();
            Ok(Some(PrivateAccess {
                id: 9,
                subscriber_id: s,
                creator_id: c,
                price: Credits::new(100),
                starts_at: now - Duration::days(1),
                expires_at: now + Duration::days(1),
                created_at: now,
            }))
        });

        let profile = service(users, MockWalletRepository::new(), subs)
            .get_profile(1, 2)
            .await
            .unwrap();
        assert!(profile.viewer_has_access);
        assert_eq!(profile.stats.post_count, 3);
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let err = service(users, MockWalletRepository::new(), MockSubscriptionRepository::new())
            .get_profile(1, 99)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::NotFound(_)));
    }
}
