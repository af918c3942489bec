use std::str::FromStr;

use cucumber::{then, when};
use fx_engine::db_types::{OrderStatusType, TransactionType};

use crate::{
    cucumber::ExchangeWorld,
    support::prepare_env::{amount, order_request},
};

#[when(expr = "{string} orders {word} {word} for {word}")]
async fn place_order(world: &mut ExchangeWorld, email: String, send: String, from: String, to: String) {
    let result = world.sys().orders.create_order(order_request(&email, &send, &from, &to)).await;
    if let Some(order) = world.record(result) {
        world.last_order = Some(order);
    }
}

#[when(expr = "{word} moves the order to {word}")]
async fn move_order(world: &mut ExchangeWorld, actor: String, status: String) {
    let status = OrderStatusType::from_str(&status).expect("Unknown order status");
    let order_id = world.order().order_id.clone();
    let result = world.sys().orders.advance_order(&order_id, status, &actor).await;
    if let Some(order) = world.record(result) {
        world.last_order = Some(order);
    }
}

#[when(expr = "{word} cancels the order")]
async fn cancel_order(world: &mut ExchangeWorld, actor: String) {
    let order_id = world.order().order_id.clone();
    let result = world.sys().orders.cancel_order(&order_id, &actor).await;
    if let Some(order) = world.record(result) {
        world.last_order = Some(order);
    }
}

#[then(expr = "the order is {word}")]
async fn order_status(world: &mut ExchangeWorld, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Unknown order status");
    let order = world.sys().orders.fetch_order(&world.order().order_id).await.expect("Order not found");
    assert_eq!(order.status, expected);
}

#[then(expr = "the order holds {word} {word}")]
async fn order_holds(world: &mut ExchangeWorld, value: String, currency: String) {
    let order = world.sys().orders.fetch_order(&world.order().order_id).await.expect("Order not found");
    assert_eq!(order.receive_method, currency);
    assert_eq!(order.hold_amount, amount(&value));
}

#[then(expr = "the order has {int} ledger entries")]
async fn ledger_entry_count(world: &mut ExchangeWorld, count: usize) {
    let entries = world.sys().wallet.entries_for_order(&world.order().order_id).await.expect("Error fetching entries");
    assert_eq!(entries.len(), count);
}

#[then(expr = "the order has {int} {word} entry")]
async fn ledger_entry_type_count(world: &mut ExchangeWorld, count: usize, entry_type: String) {
    let entry_type = TransactionType::from_str(&entry_type).expect("Unknown entry type");
    let entries = world.sys().wallet.entries_for_order(&world.order().order_id).await.expect("Error fetching entries");
    assert_eq!(entries.iter().filter(|e| e.entry_type == entry_type).count(), count);
}

#[then(expr = "the {word} reserve is {word}")]
async fn reserve_is(world: &mut ExchangeWorld, currency: String, value: String) {
    let balance = world.sys().wallet.balance(&currency).await.expect("Error fetching balance");
    assert_eq!(balance, amount(&value));
}

#[then(expr = "the {word} ledger reconciles")]
async fn ledger_reconciles(world: &mut ExchangeWorld, currency: String) {
    let report = world.sys().wallet.reconcile(&currency).await.expect("Error reconciling");
    assert!(report.is_balanced(), "{report:?}");
}

#[then(expr = "the request is rejected with {word}")]
async fn rejected_with(world: &mut ExchangeWorld, code: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert_eq!(err.code(), code);
}

#[then(expr = "{string} is restricted")]
async fn is_restricted(world: &mut ExchangeWorld, customer: String) {
    assert!(world.sys().restrictions.is_restricted(&customer).await.expect("Error checking restriction"));
}

#[then(expr = "{string} is not restricted")]
async fn is_not_restricted(world: &mut ExchangeWorld, customer: String) {
    assert!(!world.sys().restrictions.is_restricted(&customer).await.expect("Error checking restriction"));
}
