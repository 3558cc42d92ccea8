//! Subscription Repository Implementation
//!
//! One `private_access` row per subscriber/creator pair; renewals extend it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ledger;
use crate::domain::{
    extended_expiry, Credits, PrivateAccess, PurchaseReceipt, SubscriptionPurchase,
    SubscriptionRepository, WalletTransactionKind,
};
use crate::shared::error::AppError;

const ACCESS_COLUMNS: &str =
    "id, subscriber_id, creator_id, price, starts_at, expires_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct AccessRow {
    id: i64,
    subscriber_id: i64,
    creator_id: i64,
    price: i64,
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl AccessRow {
    fn into_access(self) -> PrivateAccess {
        PrivateAccess {
            id: self.id,
            subscriber_id: self.subscriber_id,
            creator_id: self.creator_id,
            price: Credits::new(self.price),
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL subscription repository implementation.
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn purchase(&self, purchase: &SubscriptionPurchase) -> Result<PurchaseReceipt, AppError> {
        let mut tx = self.pool.begin().await?;

        // The price must still be what the buyer was shown
        let current = sqlx::query_as::<_, (Option<i64>, bool)>(
            "SELECT subscription_price, banned FROM users WHERE id = $1 FOR SHARE",
        )
        .bind(purchase.creator_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Creator not found".into()))?;
        match current {
            (Some(price), false) if price == purchase.price.amount() => {}
            _ => {
                return Err(AppError::Conflict(
                    "The creator's price changed, please retry".into(),
                ))
            }
        }

        let existing = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT expires_at FROM private_access
            WHERE subscriber_id = $1 AND creator_id = $2
            FOR UPDATE
            "#,
        )
        .bind(purchase.subscriber_id)
        .bind(purchase.creator_id)
        .fetch_optional(&mut *tx)
        .await?;

        let now = Utc::now();
        let expires_at = extended_expiry(existing, now, purchase.duration);

        let row = sqlx::query_as::<_, AccessRow>(&format!(
            r#"
            INSERT INTO private_access (id, subscriber_id, creator_id, price, starts_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (subscriber_id, creator_id) DO UPDATE
            SET price = EXCLUDED.price,
                starts_at = CASE WHEN private_access.expires_at > $5
                                 THEN private_access.starts_at
                                 ELSE EXCLUDED.starts_at END,
                expires_at = EXCLUDED.expires_at
            RETURNING {}
            "#,
            ACCESS_COLUMNS
        ))
        .bind(purchase.id)
        .bind(purchase.subscriber_id)
        .bind(purchase.creator_id)
        .bind(purchase.price.amount())
        .bind(now)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        // A renewal keeps the original row id, so ledger entries point at the live row
        let (subscriber_balance, creator_balance) = ledger::transfer(
            &mut tx,
            purchase.subscriber_id,
            purchase.creator_id,
            purchase.price,
            WalletTransactionKind::Subscription,
            row.id,
        )
        .await?;

        tx.commit().await?;

        Ok(PurchaseReceipt {
            access: row.into_access(),
            subscriber_balance,
            creator_balance,
        })
    }

    async fn find(
        &self,
        subscriber_id: i64,
        creator_id: i64,
    ) -> Result<Option<PrivateAccess>, AppError> {
        let row = sqlx::query_as::<_, AccessRow>(&format!(
            "SELECT {} FROM private_access WHERE subscriber_id = $1 AND creator_id = $2",
            ACCESS_COLUMNS
        ))
        .bind(subscriber_id)
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_access()))
    }

    async fn list_active_for_subscriber(
        &self,
        subscriber_id: i64,
    ) -> Result<Vec<PrivateAccess>, AppError> {
        let rows = sqlx::query_as::<_, AccessRow>(&format!(
            r#"
            SELECT {}
            FROM private_access
            WHERE subscriber_id = $1 AND expires_at > NOW()
            ORDER BY expires_at
            "#,
            ACCESS_COLUMNS
        ))
        .bind(subscriber_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_access()).collect())
    }

    async fn list_active_subscribers(
        &self,
        creator_id: i64,
    ) -> Result<Vec<PrivateAccess>, AppError> {
        let rows = sqlx::query_as::<_, AccessRow>(&format!(
            r#"
            SELECT {}
            FROM private_access
            WHERE creator_id = $1 AND expires_at > NOW()
            ORDER BY expires_at
            "#,
            ACCESS_COLUMNS
        ))
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_access()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::infrastructure::database;
    use chrono::Duration;

    fn unique_id() -> i64 {
        (uuid::Uuid::new_v4().as_u64_pair().0 >> 2) as i64
    }

    async fn seed_user(pool: &PgPool, id: i64, balance: i64, price: Option<i64>) {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, subscription_price)
            VALUES ($1, $2, $3, 'x', $4)
            "#,
        )
        .bind(id)
        .bind(format!("u{}", id))
        .bind(format!("u{}@example.com", id))
        .bind(price)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, $2)")
            .bind(id)
            .bind(balance)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "needs the PostgreSQL instance from the test settings"]
    async fn test_renewal_ledger_points_at_access_row() {
        let settings = Settings::for_tests().unwrap();
        let pool = database::create_pool(&settings.database).await.unwrap();
        database::run_migrations(&pool).await.unwrap();

        let (subscriber_id, creator_id) = (unique_id(), unique_id());
        seed_user(&pool, subscriber_id, 1_000, None).await;
        seed_user(&pool, creator_id, 0, Some(100)).await;

        let repo = PgSubscriptionRepository::new(pool.clone());
        let purchase = |id| SubscriptionPurchase {
            id,
            subscriber_id,
            creator_id,
            price: Credits::new(100),
            duration: Duration::days(30),
        };

        let first = repo.purchase(&purchase(unique_id())).await.unwrap();
        let renewal = repo.purchase(&purchase(unique_id())).await.unwrap();
        assert_eq!(first.access.id, renewal.access.id);
        assert_eq!(renewal.subscriber_balance, Credits::new(800));

        let references = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT reference_id FROM wallet_transactions WHERE user_id = ANY($1) AND kind = 'subscription'",
        )
        .bind(vec![subscriber_id, creator_id])
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(references.len(), 4);
        assert!(references.iter().all(|r| *r == Some(first.access.id)));
    }
}
