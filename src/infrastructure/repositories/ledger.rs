//! Wallet locking and ledger writes shared by every repository that moves
//! credits. All functions run on a connection that is already inside a
//! transaction.

use std::collections::HashMap;

use sqlx::PgConnection;

use crate::domain::{Credits, WalletTransactionKind};
use crate::shared::error::AppError;

/// One side of a balance change.
#[derive(Debug, Clone)]
pub(crate) struct LedgerEntry<'a> {
    pub user_id: i64,
    pub counterparty_id: Option<i64>,
    pub delta: i64,
    pub kind: WalletTransactionKind,
    pub reference_id: Option<i64>,
    pub note: Option<&'a str>,
}

/// Lock the wallets of `user_ids` in ascending id order and return their
/// balances. Missing wallets are reported as `NotFound`.
pub(crate) async fn lock_wallets(
    conn: &mut PgConnection,
    user_ids: &[i64],
) -> Result<HashMap<i64, Credits>, AppError> {
    let rows = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT user_id, balance
        FROM wallets
        WHERE user_id = ANY($1)
        ORDER BY user_id
        FOR UPDATE
        "#,
    )
    .bind(user_ids)
    .fetch_all(&mut *conn)
    .await?;

    let balances: HashMap<i64, Credits> = rows
        .into_iter()
        .map(|(user_id, balance)| (user_id, Credits::new(balance)))
        .collect();

    if let Some(missing) = user_ids.iter().find(|id| !balances.contains_key(id)) {
        return Err(AppError::NotFound(format!("Wallet for user {} not found", missing)));
    }

    Ok(balances)
}

/// Fail with `InsufficientFunds` unless `balance` covers `amount`.
pub(crate) fn ensure_covers(balance: Credits, amount: Credits) -> Result<(), AppError> {
    if balance.checked_debit(amount).is_none() {
        return Err(AppError::InsufficientFunds(format!(
            "Balance {} is lower than {}",
            balance, amount
        )));
    }
    Ok(())
}

/// Apply `entry.delta` to a locked wallet and write its ledger row.
/// Returns the new balance.
pub(crate) async fn apply(
    conn: &mut PgConnection,
    entry: LedgerEntry<'_>,
) -> Result<Credits, AppError> {
    let balance = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE wallets
        SET balance = balance + $2, updated_at = NOW()
        WHERE user_id = $1
        RETURNING balance
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.delta)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
            AppError::InsufficientFunds("Balance cannot become negative".into())
        }
        _ => AppError::Database(e),
    })?;

    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (
            user_id, counterparty_id, amount, kind, reference_id, balance_after, note
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.counterparty_id)
    .bind(entry.delta)
    .bind(entry.kind.as_str())
    .bind(entry.reference_id)
    .bind(balance)
    .bind(entry.note)
    .execute(&mut *conn)
    .await?;

    Ok(Credits::new(balance))
}

/// Move `amount` from `payer_id` to `payee_id`, writing one ledger row per
/// wallet. Returns `(payer_balance, payee_balance)`.
pub(crate) async fn transfer(
    conn: &mut PgConnection,
    payer_id: i64,
    payee_id: i64,
    amount: Credits,
    kind: WalletTransactionKind,
    reference_id: i64,
) -> Result<(Credits, Credits), AppError> {
    let balances = lock_wallets(conn, &[payer_id, payee_id]).await?;
    ensure_covers(balances[&payer_id], amount)?;

    let payer_balance = apply(
        conn,
        LedgerEntry {
            user_id: payer_id,
            counterparty_id: Some(payee_id),
            delta: amount.negated(),
            kind,
            reference_id: Some(reference_id),
            note: None,
        },
    )
    .await?;
    let payee_balance = apply(
        conn,
        LedgerEntry {
            user_id: payee_id,
            counterparty_id: Some(payer_id),
            delta: amount.amount(),
            kind,
            reference_id: Some(reference_id),
            note: None,
        },
    )
    .await?;

    Ok((payer_balance, payee_balance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_covers() {
        assert!(ensure_covers(Credits::new(100), Credits::new(100)).is_ok());
        let err = ensure_covers(Credits::new(99), Credits::new(100)).unwrap_err();
        assert_eq!(err.code(), 10008);
    }
}
