//! Wallet Service
//!
//! Balance, ledger and sandbox deposits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::WalletSettings;
use crate::domain::{Credits, Wallet, WalletRepository, WalletTransaction};
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

/// Wallet service trait
#[async_trait]
pub trait WalletService: Send + Sync {
    async fn get_wallet(&self, user_id: i64) -> Result<Wallet, WalletError>;

    async fn list_transactions(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<WalletTransaction>, WalletError>;

    /// Top up one's own wallet, when enabled
    async fn deposit(&self, user_id: i64, amount: i64) -> Result<Wallet, WalletError>;
}

/// Wallet service errors
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet not found")]
    NotFound,

    #[error("Self deposits are disabled")]
    DepositsDisabled,

    #[error("Amount must be between 1 and {0}")]
    InvalidAmount(i64),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<WalletError> for AppError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::NotFound => AppError::NotFound("Wallet not found".into()),
            WalletError::DepositsDisabled => AppError::Forbidden(e.to_string()),
            e @ WalletError::InvalidAmount(_) => AppError::invalid_field("amount", e.to_string()),
            WalletError::Repository(e) => e,
        }
    }
}

/// WalletService implementation
pub struct WalletServiceImpl<W>
where
    W: WalletRepository,
{
    wallet_repo: Arc<W>,
    settings: WalletSettings,
}

impl<W> WalletServiceImpl<W>
where
    W: WalletRepository,
{
    pub fn new(wallet_repo: Arc<W>, settings: WalletSettings) -> Self {
        Self {
            wallet_repo,
            settings,
        }
    }
}

#[async_trait]
impl<W> WalletService for WalletServiceImpl<W>
where
    W: WalletRepository + 'static,
{
    async fn get_wallet(&self, user_id: i64) -> Result<Wallet, WalletError> {
        self.wallet_repo
            .find_by_user(user_id)
            .await?
            .ok_or(WalletError::NotFound)
    }

    async fn list_transactions(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        Ok(self.wallet_repo.list_transactions(user_id, page).await?)
    }

    async fn deposit(&self, user_id: i64, amount: i64) -> Result<Wallet, WalletError> {
        if !self.settings.allow_self_deposit {
            return Err(WalletError::DepositsDisabled);
        }
        let max = self.settings.max_deposit;
        let amount = Credits::positive(amount)
            .filter(|a| a.amount() <= max)
            .ok_or(WalletError::InvalidAmount(max))?;

        let wallet = self
            .wallet_repo
            .deposit(user_id, amount, Some("Self deposit".into()))
            .await?;
        tracing::info!(user_id, amount = amount.amount(), "Wallet deposit");
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockWalletRepository;
    use chrono::Utc;

    fn settings(allow_self_deposit: bool) -> WalletSettings {
        WalletSettings {
            initial_balance: 0,
            allow_self_deposit,
            max_deposit: 5_000,
            max_transfer: 5_000,
        }
    }

    #[tokio::test]
    async fn test_deposit_disabled() {
        let mut wallets = MockWalletRepository::new();
        wallets.expect_deposit().never();

        let err = WalletServiceImpl::new(Arc::new(wallets), settings(false))
            .deposit(1, 100)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_deposit_bounds() {
        let service = WalletServiceImpl::new(Arc::new(MockWalletRepository::new()), settings(true));
        assert!(matches!(service.deposit(1, 0).await, Err(WalletError::InvalidAmount(5_000))));
        assert!(matches!(service.deposit(1, 5_001).await, Err(WalletError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_deposit_credits_wallet() {
        let mut wallets = MockWalletRepository::new();
        wallets
            .expect_deposit()
            .withf(|user_id, amount, _| *user_id == 1 && *amount == Credits::new(100))
            .times(1)
            .returning(|user_id, amount, _| {
                Ok(Wallet {
                    user_id,
                    balance: amount,
                    updated_at: Utc::now(),
                })
            });

        let wallet = WalletServiceImpl::new(Arc::new(wallets), settings(true))
            .deposit(1, 100)
            .await
            .unwrap();
        assert_eq!(wallet.balance, Credits::new(100));
    }

    #[tokio::test]
    async fn test_missing_wallet() {
        let mut wallets = MockWalletRepository::new();
        wallets.expect_find_by_user().returning(|_| Ok(None));

        let err = WalletServiceImpl::new(Arc::new(wallets), settings(true))
            .get_wallet(1)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NotFound));
    }
}
