//! Wallet entity, ledger entries and repository trait.
//!
//! Maps to the `wallets` and `wallet_transactions` tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Credits;
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

/// Ledger entry kinds matching the `wallet_transactions.kind` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionKind {
    Deposit,
    /// Payment inside a chat
    Transfer,
    /// Private access purchase
    Subscription,
    /// Manual correction by an admin
    Adjustment,
}

impl WalletTransactionKind {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "transfer" => Self::Transfer,
            "subscription" => Self::Subscription,
            "adjustment" => Self::Adjustment,
            _ => Self::Deposit,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Transfer => "transfer",
            Self::Subscription => "subscription",
            Self::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for WalletTransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a user's wallet.
///
/// Maps to the `wallets` table:
/// - user_id: BIGINT PRIMARY KEY REFERENCES users(id)
/// - balance: BIGINT NOT NULL CHECK (balance >= 0)
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance: Credits,
    pub updated_at: DateTime<Utc>,
}

/// One ledger row; every balance change writes one per affected wallet.
///
/// Maps to the `wallet_transactions` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - user_id: BIGINT NOT NULL REFERENCES wallets(user_id)
/// - counterparty_id: BIGINT NULL
/// - amount: BIGINT NOT NULL (signed, negative = debit)
/// - kind: TEXT NOT NULL
/// - reference_id: BIGINT NULL (chat message or subscription id)
/// - balance_after: BIGINT NOT NULL
/// - note: TEXT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i64,
    pub counterparty_id: Option<i64>,
    pub amount: i64,
    pub kind: WalletTransactionKind,
    pub reference_id: Option<i64>,
    pub balance_after: Credits,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

/// Repository trait for Wallet data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find_by_user(&self, user_id: i64) -> Result<Option<Wallet>, AppError>;

    /// Ledger entries of a wallet, newest first.
    async fn list_transactions(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<WalletTransaction>, AppError>;

    /// Credit a wallet and record a `deposit` ledger row.
    async fn deposit(
        &self,
        user_id: i64,
        amount: Credits,
        note: Option<String>,
    ) -> Result<Wallet, AppError>;

    /// Apply a signed admin correction and record an `adjustment` ledger row.
    ///
    /// Returns `InsufficientFunds` if the balance would become negative.
    async fn adjust(
        &self,
        user_id: i64,
        delta: i64,
        note: Option<String>,
    ) -> Result<Wallet, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(WalletTransactionKind::from_str("subscription"), WalletTransactionKind::Subscription);
        assert_eq!(WalletTransactionKind::Adjustment.to_string(), "adjustment");
    }

    #[test]
    fn test_is_debit() {
        let entry = WalletTransaction {
            id: 1,
            user_id: 1,
            counterparty_id: Some(2),
            amount: -50,
            kind: WalletTransactionKind::Transfer,
            reference_id: None,
            balance_after: Credits::new(10),
            note: None,
            created_at: Utc::now(),
        };
        assert!(entry.is_debit());
    }
}
