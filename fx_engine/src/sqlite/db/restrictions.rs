use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    config::RestrictionPolicy,
    db_types::{CustomerRestriction, OrderId},
    traits::EngineError,
};

pub async fn fetch_restriction(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<CustomerRestriction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM customer_restrictions WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await
}

/// Records a cancellation for `customer_id` and re-evaluates `policy` against the customer's cancellation history.
///
/// The cancellation count only ever grows. An existing restriction is never shortened by a later cancellation that
/// does not trip the threshold.
pub async fn record_cancellation(
    customer_id: &str,
    order_id: Option<&OrderId>,
    policy: &RestrictionPolicy,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<CustomerRestriction, EngineError> {
    sqlx::query("INSERT INTO customer_cancellations (customer_id, order_id, cancelled_at) VALUES ($1, $2, $3)")
        .bind(customer_id)
        .bind(order_id.map(|o| o.as_str()))
        .bind(at)
        .execute(&mut *conn)
        .await?;
    let history: Vec<DateTime<Utc>> =
        sqlx::query_scalar("SELECT cancelled_at FROM customer_cancellations WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;
    let recent = policy.count_recent(&history, at);
    let restricted_until = policy.restriction_for(recent, at);
    if let Some(until) = restricted_until {
        debug!("🗃️ Customer {customer_id} has cancelled {recent} orders recently. Restricted until {until}");
    }
    let restriction = sqlx::query_as(
        r#"
        INSERT INTO customer_restrictions
            (customer_id, cancellation_count, last_cancellation_at, restricted_until, updated_at)
        VALUES ($1, 1, $2, $3, $2)
        ON CONFLICT(customer_id) DO UPDATE SET
            cancellation_count = cancellation_count + 1,
            last_cancellation_at = excluded.last_cancellation_at,
            restricted_until = COALESCE(excluded.restricted_until, restricted_until),
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(customer_id)
    .bind(at)
    .bind(restricted_until)
    .fetch_one(conn)
    .await?;
    Ok(restriction)
}
