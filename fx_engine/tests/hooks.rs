use std::sync::{Arc, Mutex};

use fx_engine::{
    db_types::{Order, OrderStatusType},
    events::{BalanceEvent, EventHandlers, EventHooks, EventType, LiveEvent, StatusChangeEvent},
};
use log::*;

mod support;

use support::prepare_env::{amount, order_request, TestSystem, ADMIN};

fn event_types(events: &[LiveEvent]) -> Vec<EventType> {
    events.iter().map(|e| e.event_type).collect()
}

#[tokio::test]
async fn events_follow_committed_changes() {
    let sys = TestSystem::new().await;
    sys.seed_pair("A", "B", "0.93", "1000").await;
    let mut subscription = sys.notifier.subscribe();

    let order = sys.orders.create_order(order_request("alice@example.com", "100", "A", "B")).await.unwrap();
    sys.orders.cancel_order(&order.order_id, ADMIN).await.unwrap();
    // A rejected request publishes nothing
    let _ = sys.orders.create_order(order_request("alice@example.com", "100000", "A", "B")).await.unwrap_err();

    let mut events = Vec::new();
    while let Some(event) = subscription.try_next() {
        events.push(event);
    }
    assert_eq!(event_types(&events), vec![
        EventType::NewOrder,
        EventType::BalanceUpdate,
        EventType::StatusChange,
        EventType::OrderUpdate,
        EventType::BalanceUpdate,
    ]);
    let created = events[0].payload::<Order>().unwrap();
    assert_eq!(created.order_id, order.order_id);
    assert_eq!(events[1].payload::<BalanceEvent>().unwrap().balance, amount("907"));
    let change = events[2].payload::<StatusChangeEvent>().unwrap();
    assert_eq!(change.old_status, OrderStatusType::Pending);
    assert_eq!(change.new_status, OrderStatusType::Cancelled);
    assert_eq!(change.changed_by, ADMIN);
    assert_eq!(events[4].payload::<BalanceEvent>().unwrap().balance, amount("1000"));
    assert_eq!(subscription.missed(), 0);
    sys.teardown().await;
}

#[tokio::test]
async fn admin_changes_are_published() {
    let sys = TestSystem::new().await;
    let mut subscription = sys.notifier.subscribe();
    sys.seed_pair("A", "B", "0.93", "1000").await;
    sys.rates.set_currency_limit("A", "B", amount("1"), amount("100"), ADMIN).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = subscription.try_next() {
        events.push(event);
    }
    assert_eq!(event_types(&events), vec![
        EventType::ExchangeRateUpdate,
        EventType::BalanceUpdate,
        EventType::CurrencyLimitUpdate
    ]);
    sys.teardown().await;
}

#[tokio::test]
async fn hooks_see_every_status_change() {
    let sys = TestSystem::new().await;
    sys.seed_pair("A", "B", "2", "1000").await;
    let seen = Arc::new(Mutex::new(Vec::<StatusChangeEvent>::new()));
    let all = Arc::new(Mutex::new(0usize));
    let mut hooks = EventHooks::default();
    let seen_hook = Arc::clone(&seen);
    hooks.on_event(EventType::StatusChange, move |ev| {
        let seen = Arc::clone(&seen_hook);
        Box::pin(async move {
            let change = ev.payload::<StatusChangeEvent>().expect("Malformed status change");
            info!("🚀️ Hook saw {} -> {}", change.old_status, change.new_status);
            seen.lock().unwrap().push(change);
        })
    });
    let all_hook = Arc::clone(&all);
    hooks.on_any_event(move |_| {
        let all = Arc::clone(&all_hook);
        Box::pin(async move {
            *all.lock().unwrap() += 1;
        })
    });
    let handles = EventHandlers::new(&sys.notifier, hooks).start_handlers();

    let order = sys.orders.create_order(order_request("bob@example.com", "10", "A", "B")).await.unwrap();
    for status in [OrderStatusType::Paid, OrderStatusType::Processing, OrderStatusType::Completed] {
        sys.orders.advance_order(&order.order_id, status, ADMIN).await.unwrap();
    }
    // Dropping every notifier lets the hooks drain and finish
    sys.teardown().await;
    for handle in handles {
        handle.await.unwrap();
    }
    let seen = seen.lock().unwrap();
    let steps = seen.iter().map(|c| (c.old_status, c.new_status)).collect::<Vec<_>>();
    assert_eq!(steps, vec![
        (OrderStatusType::Pending, OrderStatusType::Paid),
        (OrderStatusType::Paid, OrderStatusType::Processing),
        (OrderStatusType::Processing, OrderStatusType::Completed),
    ]);
    // new_order + balance, then status_change + order_update (+ balance on completion) per step
    assert_eq!(*all.lock().unwrap(), 2 + 2 + 2 + 3);
}
