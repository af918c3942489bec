use chrono::{DateTime, Utc};
use fx_common::Rate;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CurrencyPair, ExchangeRate, ExchangeRateHistory},
    traits::EngineError,
};

pub async fn fetch_rate(pair: &CurrencyPair, conn: &mut SqliteConnection) -> Result<Option<ExchangeRate>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM exchange_rates WHERE from_currency = $1 AND to_currency = $2")
        .bind(pair.from.as_str())
        .bind(pair.to.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_rates(conn: &mut SqliteConnection) -> Result<Vec<ExchangeRate>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM exchange_rates ORDER BY from_currency, to_currency").fetch_all(conn).await
}

/// Appends a history row recording the change from the currently stored rate (if any) to `rate`.
///
/// Call this before [`upsert_rate`] in the same transaction. It is a write, so it also takes the writer lock before
/// the current rate is read.
pub async fn insert_history(
    pair: &CurrencyPair,
    rate: Rate,
    actor: &str,
    reason: Option<&str>,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ExchangeRateHistory, EngineError> {
    let history = sqlx::query_as(
        r#"
        INSERT INTO exchange_rate_history
            (from_currency, to_currency, old_rate, new_rate, changed_by, reason, changed_at)
        VALUES ($1, $2, (SELECT rate FROM exchange_rates WHERE from_currency = $1 AND to_currency = $2), $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(pair.from.as_str())
    .bind(pair.to.as_str())
    .bind(rate)
    .bind(actor)
    .bind(reason)
    .bind(at)
    .fetch_one(conn)
    .await?;
    Ok(history)
}

pub async fn upsert_rate(
    pair: &CurrencyPair,
    rate: Rate,
    actor: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ExchangeRate, EngineError> {
    let rate = sqlx::query_as(
        r#"
        INSERT INTO exchange_rates (from_currency, to_currency, rate, updated_at, updated_by)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT(from_currency, to_currency) DO UPDATE SET
            rate = excluded.rate,
            updated_at = excluded.updated_at,
            updated_by = excluded.updated_by
        RETURNING *
        "#,
    )
    .bind(pair.from.as_str())
    .bind(pair.to.as_str())
    .bind(rate)
    .bind(at)
    .bind(actor)
    .fetch_one(conn)
    .await?;
    Ok(rate)
}

pub async fn fetch_history(
    pair: &CurrencyPair,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExchangeRateHistory>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM exchange_rate_history WHERE from_currency = $1 AND to_currency = $2 ORDER BY id ASC")
        .bind(pair.from.as_str())
        .bind(pair.to.as_str())
        .fetch_all(conn)
        .await
}
