//! Wallet Repository Implementation
//!
//! Balances live in `wallets`; every change appends to `wallet_transactions`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ledger::{self, LedgerEntry};
use crate::domain::{Credits, Wallet, WalletRepository, WalletTransaction, WalletTransactionKind};
use crate::shared::error::AppError;
use crate::shared::pagination::Page;

#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    user_id: i64,
    balance: i64,
    updated_at: DateTime<Utc>,
}

impl WalletRow {
    fn into_wallet(self) -> Wallet {
        Wallet {
            user_id: self.user_id,
            balance: Credits::new(self.balance),
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WalletTransactionRow {
    id: i64,
    user_id: i64,
    counterparty_id: Option<i64>,
    amount: i64,
    kind: String,
    reference_id: Option<i64>,
    balance_after: i64,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl WalletTransactionRow {
    fn into_transaction(self) -> WalletTransaction {
        WalletTransaction {
            id: self.id,
            user_id: self.user_id,
            counterparty_id: self.counterparty_id,
            amount: self.amount,
            kind: WalletTransactionKind::from_str(&self.kind),
            reference_id: self.reference_id,
            balance_after: Credits::new(self.balance_after),
            note: self.note,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL wallet repository implementation.
#[derive(Clone)]
pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock one wallet, apply a signed change and return the updated wallet.
    async fn change_balance(
        &self,
        user_id: i64,
        delta: i64,
        kind: WalletTransactionKind,
        note: Option<String>,
    ) -> Result<Wallet, AppError> {
        let mut tx = self.pool.begin().await?;

        let balances = ledger::lock_wallets(&mut tx, &[user_id]).await?;
        if delta < 0 {
            ledger::ensure_covers(balances[&user_id], Credits::new(delta.saturating_neg()))?;
        }
        ledger::apply(
            &mut tx,
            LedgerEntry {
                user_id,
                counterparty_id: None,
                delta,
                kind,
                reference_id: None,
                note: note.as_deref(),
            },
        )
        .await?;

        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT user_id, balance, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into_wallet())
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn find_by_user(&self, user_id: i64) -> Result<Option<Wallet>, AppError> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT user_id, balance, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_wallet()))
    }

    async fn list_transactions(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        let rows = sqlx::query_as::<_, WalletTransactionRow>(
            r#"
            SELECT id, user_id, counterparty_id, amount, kind, reference_id,
                   balance_after, note, created_at
            FROM wallet_transactions
            WHERE user_id = $1 AND id < $2
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(page.before_or_max())
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_transaction()).collect())
    }

    async fn deposit(
        &self,
        user_id: i64,
        amount: Credits,
        note: Option<String>,
    ) -> Result<Wallet, AppError> {
        self.change_balance(user_id, amount.amount(), WalletTransactionKind::Deposit, note)
            .await
    }

    async fn adjust(
        &self,
        user_id: i64,
        delta: i64,
        note: Option<String>,
    ) -> Result<Wallet, AppError> {
        self.change_balance(user_id, delta, WalletTransactionKind::Adjustment, note)
            .await
    }
}
