use std::time::Duration as StdDuration;

use chrono::Duration;
use fx_engine::{db_types::OrderStatusType, order_objects::NewOrderRequest, OrderRejection, RestrictionPolicy};
use log::*;

mod support;

use support::prepare_env::{amount, order_request, test_config, TestSystem, ADMIN};

async fn short_cooldown_system() -> TestSystem {
    let policy = RestrictionPolicy::new(3, Duration::hours(24), Duration::seconds(2));
    let sys = TestSystem::with_config(test_config().with_restriction_policy(policy)).await;
    sys.seed_pair("A", "B", "1", "10000").await;
    sys
}

#[tokio::test]
async fn repeated_cancellations_restrict_the_customer() {
    let sys = short_cooldown_system().await;
    // Differently formatted versions of the same address count as one customer
    for email in ["carol@example.com", " CAROL@example.com", "Carol@Example.com "] {
        assert!(!sys.restrictions.is_restricted("carol@example.com").await.unwrap());
        let order = sys.orders.create_order(order_request(email, "10", "A", "B")).await.unwrap();
        sys.orders.cancel_order(&order.order_id, ADMIN).await.unwrap();
    }
    assert!(sys.restrictions.is_restricted("carol@example.com").await.unwrap());
    let restriction = sys.restrictions.restriction("carol@example.com").await.unwrap().unwrap();
    assert_eq!(restriction.cancellation_count, 3);
    assert!(restriction.restricted_until.is_some());

    let err = sys.orders.create_order(order_request("carol@example.com", "10", "A", "B")).await.unwrap_err();
    assert!(matches!(err, OrderRejection::RestrictedCustomer { .. }), "{err:?}");
    assert_eq!(err.code(), "RESTRICTED_CUSTOMER");
    assert_eq!(sys.wallet.balance("B").await.unwrap(), amount("10000"));

    // Other customers are unaffected
    sys.orders.create_order(order_request("dave@example.com", "10", "A", "B")).await.unwrap();

    info!("🚀️ Waiting out the cooldown");
    tokio::time::sleep(StdDuration::from_millis(2500)).await;
    assert!(!sys.restrictions.is_restricted("carol@example.com").await.unwrap());
    let order = sys.orders.create_order(order_request("carol@example.com", "10", "A", "B")).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);

    // Still over the threshold within the window, so the next cancellation restricts again
    sys.orders.cancel_order(&order.order_id, ADMIN).await.unwrap();
    assert!(sys.restrictions.is_restricted("carol@example.com").await.unwrap());
    let restriction = sys.restrictions.restriction("carol@example.com").await.unwrap().unwrap();
    assert_eq!(restriction.cancellation_count, 4);
    sys.teardown().await;
}

fn with_phone(phone: &str, email: Option<&str>) -> NewOrderRequest {
    let request = order_request(email.unwrap_or("unused@example.com"), "10", "A", "B");
    NewOrderRequest { customer_phone: Some(phone.into()), customer_email: email.map(String::from), ..request }
}

#[tokio::test]
async fn restriction_follows_every_contact_detail() {
    let sys = short_cooldown_system().await;
    for _ in 0..3 {
        let order = sys.orders.create_order(with_phone("+254712345678", Some("mallory@example.com"))).await.unwrap();
        assert_eq!(order.customer_id, "+254712345678");
        sys.orders.cancel_order(&order.order_id, ADMIN).await.unwrap();
    }
    assert!(sys.restrictions.is_restricted("+254 712 345 678").await.unwrap());
    assert!(sys.restrictions.is_restricted("Mallory@example.com").await.unwrap());

    // Dropping the phone number does not get around the restriction
    let err = sys.orders.create_order(order_request("mallory@example.com", "10", "A", "B")).await.unwrap_err();
    assert_eq!(err.code(), "RESTRICTED_CUSTOMER");
    // Nor does dropping the email
    let err = sys.orders.create_order(with_phone("+254-712-345-678", None)).await.unwrap_err();
    assert_eq!(err.code(), "RESTRICTED_CUSTOMER");
    assert_eq!(sys.wallet.balance("B").await.unwrap(), amount("10000"));
    sys.teardown().await;
}

#[tokio::test]
async fn adding_a_phone_does_not_lift_an_email_restriction() {
    let sys = short_cooldown_system().await;
    for _ in 0..3 {
        let order = sys.orders.create_order(order_request("oscar@example.com", "10", "A", "B")).await.unwrap();
        sys.orders.cancel_order(&order.order_id, ADMIN).await.unwrap();
    }
    let err = sys.orders.create_order(with_phone("0712000111", Some("OSCAR@example.com"))).await.unwrap_err();
    assert!(matches!(err, OrderRejection::RestrictedCustomer { .. }), "{err:?}");
    // The unrelated phone number is not restricted on its own
    assert!(!sys.restrictions.is_restricted("0712000111").await.unwrap());
    sys.orders.create_order(with_phone("0712000111", None)).await.unwrap();
    sys.teardown().await;
}

#[tokio::test]
async fn completed_orders_do_not_count() {
    let sys = short_cooldown_system().await;
    for _ in 0..3 {
        let order = sys.orders.create_order(order_request("erin@example.com", "10", "A", "B")).await.unwrap();
        sys.orders.advance_order(&order.order_id, OrderStatusType::Processing, ADMIN).await.unwrap();
        sys.orders.advance_order(&order.order_id, OrderStatusType::Completed, ADMIN).await.unwrap();
    }
    assert!(sys.restrictions.restriction("erin@example.com").await.unwrap().is_none());
    assert!(!sys.restrictions.is_restricted("erin@example.com").await.unwrap());
    sys.teardown().await;
}

#[tokio::test]
async fn cancellations_recorded_out_of_band() {
    let sys = short_cooldown_system().await;
    let first = sys.restrictions.record_cancellation("+254 712 345 678").await.unwrap();
    assert_eq!(first.customer_id, "+254712345678");
    assert_eq!(first.cancellation_count, 1);
    assert!(first.restricted_until.is_none());
    sys.restrictions.record_cancellation("+254712345678").await.unwrap();
    let third = sys.restrictions.record_cancellation("+254-712-345-678").await.unwrap();
    assert!(third.restricted_until.is_some());
    assert!(sys.restrictions.is_restricted("+254712345678").await.unwrap());

    let err = sys.restrictions.record_cancellation("   ").await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    sys.teardown().await;
}
