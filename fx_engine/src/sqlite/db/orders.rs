use chrono::{DateTime, Datelike, Utc};
use fx_common::Amount;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusChange, OrderStatusType},
    fx_api::order_objects::OrderQueryFilter,
    traits::EngineError,
};

/// Allocates the next order id for the year of `at`. Sequences restart at 1 every year and are never reused.
pub async fn next_order_id(
    prefix: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<OrderId, EngineError> {
    let year = at.year();
    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO order_counters (year, last_value) VALUES ($1, 1)
        ON CONFLICT(year) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(year)
    .fetch_one(conn)
    .await?;
    Ok(OrderId::generate(prefix, year, sequence))
}

/// Inserts a new order in `pending`, with its hold set to the receive amount. This is not atomic. Embed the call in a
/// transaction together with the matching `HOLD` entry.
pub async fn insert_order(
    order_id: &OrderId,
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<Order, EngineError> {
    let hold = order.hold_amount();
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_name,
                customer_email,
                customer_phone,
                customer_id,
                send_method,
                receive_method,
                send_amount,
                receive_amount,
                exchange_rate,
                status,
                payment_wallet,
                hold_amount,
                created_at,
                updated_at,
                updated_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(order.customer_name)
    .bind(order.customer_email)
    .bind(order.customer_phone)
    .bind(order.customer_id)
    .bind(order.send_method)
    .bind(order.receive_method)
    .bind(order.send_amount)
    .bind(order.receive_amount)
    .bind(order.exchange_rate)
    .bind(OrderStatusType::Pending)
    .bind(order.payment_wallet)
    .bind(hold)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Moves the order to `new_status` and sets its hold, but only if the stored status and hold still match `expected`.
/// Returns `None` (and changes nothing) if they don't.
pub async fn compare_and_set_status(
    expected: &Order,
    new_status: OrderStatusType,
    new_hold: Amount,
    actor: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, EngineError> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET status = $1, hold_amount = $2, updated_at = $3, updated_by = $4
        WHERE order_id = $5 AND status = $6 AND hold_amount = $7
        RETURNING *
        "#,
    )
    .bind(new_status)
    .bind(new_hold)
    .bind(at)
    .bind(actor)
    .bind(expected.order_id.as_str())
    .bind(expected.status)
    .bind(expected.hold_amount)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Works out why a conditional status update matched nothing.
pub async fn transition_failure(
    snapshot: &Order,
    target: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<EngineError, EngineError> {
    let current = fetch_order_by_order_id(&snapshot.order_id, conn).await?;
    let err = match current {
        None => EngineError::OrderNotFound(snapshot.order_id.clone()),
        Some(order) if !order.status.can_transition_to(target) => {
            EngineError::InvalidTransition { order_id: order.order_id, from: order.status, to: target }
        },
        Some(order) => EngineError::ConcurrencyConflict(format!(
            "order {} changed from {} to {} while it was being updated",
            order.order_id, snapshot.status, order.status
        )),
    };
    Ok(err)
}

pub async fn insert_status_change(
    order_id: &OrderId,
    old_status: Option<OrderStatusType>,
    new_status: OrderStatusType,
    actor: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO order_status_history (order_id, old_status, new_status, changed_by, changed_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(order_id.as_str())
    .bind(old_status)
    .bind(new_status)
    .bind(actor)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_status_history(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderStatusChange>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.0);
    }
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(send_method) = query.send_method {
        where_clause.push("send_method = ");
        where_clause.push_bind_unseparated(send_method);
    }
    if let Some(receive_method) = query.receive_method {
        where_clause.push("receive_method = ");
        where_clause.push_bind_unseparated(receive_method);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Sum of `hold_amount` over open orders paying out in `currency`.
pub async fn outstanding_holds(currency: &str, conn: &mut SqliteConnection) -> Result<Amount, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(hold_amount), 0) FROM orders
        WHERE receive_method = $1 AND status NOT IN ('completed', 'cancelled')
        "#,
    )
    .bind(currency)
    .fetch_one(conn)
    .await?;
    Ok(Amount::from_minor(total))
}
