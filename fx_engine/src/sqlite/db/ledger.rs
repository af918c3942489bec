use chrono::{DateTime, Utc};
use fx_common::Amount;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Balance, LedgerEntry, NewLedgerEntry, OrderId},
    traits::{EngineError, LedgerAdjustment},
};

/// Makes sure a balance row exists for `currency`. New currencies start at zero.
///
/// This is a write, so calling it first in a transaction takes SQLite's writer lock up front.
pub async fn ensure_balance_row(
    currency: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), EngineError> {
    sqlx::query(
        "INSERT INTO balances (currency, amount, updated_at) VALUES ($1, 0, $2) ON CONFLICT(currency) DO NOTHING",
    )
        .bind(currency)
        .bind(at)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_balance(currency: &str, conn: &mut SqliteConnection) -> Result<Amount, sqlx::Error> {
    let amount: Option<i64> = sqlx::query_scalar("SELECT amount FROM balances WHERE currency = $1")
        .bind(currency)
        .fetch_optional(conn)
        .await?;
    Ok(amount.map(Amount::from_minor).unwrap_or_default())
}

pub async fn fetch_balances(conn: &mut SqliteConnection) -> Result<Vec<Balance>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM balances ORDER BY currency").fetch_all(conn).await
}

/// Applies `entry` to its currency's balance and appends it to the ledger. This is not atomic on its own: run it
/// inside a transaction so the balance update and the entry commit (or roll back) together.
///
/// The balance update is a single conditional statement, so a debit that would overdraw the reserve changes nothing
/// and yields [`EngineError::InsufficientReserve`].
pub async fn adjust(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerAdjustment, EngineError> {
    if !entry.amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!("Ledger entries must be positive, got {}", entry.amount)));
    }
    let now = Utc::now();
    let delta = entry.delta();
    ensure_balance_row(&entry.currency, now, conn).await?;
    let balance: Option<Balance> = sqlx::query_as(
        r#"
        UPDATE balances SET amount = amount + $1, updated_at = $2
        WHERE currency = $3 AND amount + $1 >= 0
        RETURNING *
        "#,
    )
    .bind(delta.value())
    .bind(now)
    .bind(entry.currency.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    let balance = match balance {
        Some(b) => b,
        None => {
            let available = fetch_balance(&entry.currency, conn).await?;
            return Err(EngineError::InsufficientReserve {
                currency: entry.currency,
                requested: entry.amount,
                available,
            });
        },
    };
    let entry: LedgerEntry = sqlx::query_as(
        r#"
        INSERT INTO ledger_entries (
            order_id,
            entry_type,
            currency,
            amount,
            from_wallet,
            to_wallet,
            description,
            created_by,
            created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(entry.order_id.as_ref().map(|o| o.as_str()))
    .bind(entry.entry_type)
    .bind(entry.currency.as_str())
    .bind(entry.amount)
    .bind(entry.from_wallet)
    .bind(entry.to_wallet)
    .bind(entry.description.as_str())
    .bind(entry.created_by.as_str())
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!(
        "🗃️ {} {} {} applied. {} balance is now {}",
        entry.entry_type,
        entry.amount,
        entry.currency,
        balance.currency,
        balance.amount
    );
    Ok(LedgerAdjustment { entry, balance })
}

pub async fn fetch_entries(currency: &str, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE currency = $1 ORDER BY id ASC")
        .bind(currency)
        .fetch_all(conn)
        .await
}

pub async fn fetch_entries_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}

/// Returns (signed sum of all entries, HOLD total minus RELEASE total) for `currency`.
pub async fn ledger_totals(currency: &str, conn: &mut SqliteConnection) -> Result<(Amount, Amount), sqlx::Error> {
    let (total, net_holds): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE
                WHEN from_wallet = 'exchange_reserve' AND to_wallet <> 'exchange_reserve' THEN -amount
                WHEN to_wallet = 'exchange_reserve' AND from_wallet <> 'exchange_reserve' THEN amount
                ELSE 0 END), 0),
            COALESCE(SUM(CASE
                WHEN entry_type = 'HOLD' THEN amount
                WHEN entry_type = 'RELEASE' THEN -amount
                ELSE 0 END), 0)
        FROM ledger_entries WHERE currency = $1
        "#,
    )
    .bind(currency)
    .fetch_one(conn)
    .await?;
    Ok((Amount::from_minor(total), Amount::from_minor(net_holds)))
}
