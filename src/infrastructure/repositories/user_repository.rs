//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the database schema and domain User entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ledger::{self, LedgerEntry};
use crate::domain::{Credits, User, UserRepository, UserRole, UserStats, WalletTransactionKind};
use crate::shared::error::{conflict_on_unique, AppError};
use crate::shared::pagination::Page;

const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, bio, role, banned, \
                            subscription_price, created_at, updated_at";

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    bio: Option<String>,
    role: String,
    banned: bool,
    subscription_price: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            display_name: self.display_name,
            bio: self.bio,
            role: UserRole::from_str(&self.role),
            banned: self.banned,
            subscription_price: self.subscription_price.map(Credits::new),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Escape LIKE wildcards in user input.
fn like_prefix(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{}%", escaped)
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Insert the user and open their wallet in one transaction.
    async fn create(&self, user: &User, initial_balance: Credits) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, display_name, bio, role,
                               banned, subscription_price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(user.role.as_str())
        .bind(user.banned)
        .bind(user.subscription_price.map(i64::from))
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "User with this email or username already exists"))?;

        sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, 0)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        if initial_balance.is_positive() {
            ledger::apply(
                &mut tx,
                LedgerEntry {
                    user_id: user.id,
                    counterparty_id: None,
                    delta: initial_balance.amount(),
                    kind: WalletTransactionKind::Deposit,
                    reference_id: None,
                    note: Some("Initial balance"),
                },
            )
            .await?;
        }

        tx.commit().await?;
        Ok(row.into_user())
    }

    async fn update_profile(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET display_name = $2,
                bio = $3,
                subscription_price = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(user.subscription_price.map(i64::from))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;

        Ok(row.into_user())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn set_banned(&self, id: i64, banned: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET banned = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(banned)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        Ok(())
    }

    async fn search(&self, query: Option<String>, page: Page) -> Result<Vec<User>, AppError> {
        let pattern = query.as_deref().map(like_prefix);
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE id < $1
              AND ($2::text IS NULL OR username ILIKE $2 OR email ILIKE $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
            USER_COLUMNS
        ))
        .bind(page.before_or_max())
        .bind(pattern)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_user()).collect())
    }

    async fn stats(&self, id: i64) -> Result<UserStats, AppError> {
        let (post_count, rating_average, rating_count) =
            sqlx::query_as::<_, (i64, Option<f64>, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM posts WHERE author_id = $1 AND deleted_at IS NULL),
                    (SELECT AVG(score)::float8 FROM ratings WHERE ratee_id = $1),
                    (SELECT COUNT(*) FROM ratings WHERE ratee_id = $1)
                "#,
            )
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(UserStats {
            post_count,
            rating_average,
            rating_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("ann"), "ann%");
        assert_eq!(like_prefix("50%_off"), "50\\%\\_off%");
    }
}
