use chrono::{DateTime, Utc};
use fx_common::Amount;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CurrencyLimit, CurrencyPair},
    traits::EngineError,
};

pub async fn fetch_limit(
    pair: &CurrencyPair,
    conn: &mut SqliteConnection,
) -> Result<Option<CurrencyLimit>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM currency_limits WHERE from_currency = $1 AND to_currency = $2")
        .bind(pair.from.as_str())
        .bind(pair.to.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn upsert_limit(
    pair: &CurrencyPair,
    min: Amount,
    max: Amount,
    actor: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CurrencyLimit, EngineError> {
    let limit = sqlx::query_as(
        r#"
        INSERT INTO currency_limits (from_currency, to_currency, min_amount, max_amount, updated_at, updated_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT(from_currency, to_currency) DO UPDATE SET
            min_amount = excluded.min_amount,
            max_amount = excluded.max_amount,
            updated_at = excluded.updated_at,
            updated_by = excluded.updated_by
        RETURNING *
        "#,
    )
    .bind(pair.from.as_str())
    .bind(pair.to.as_str())
    .bind(min)
    .bind(max)
    .bind(at)
    .bind(actor)
    .fetch_one(conn)
    .await?;
    Ok(limit)
}
