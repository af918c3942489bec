use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    config::EngineConfig,
    db_types::{NewOrder, Order, OrderId, OrderStatusChange, OrderStatusType},
    events::{BalanceEvent, ChangeNotifier, EventType, StatusChangeEvent},
    fx_api::{
        errors::OrderRejection,
        exchange_rate_api::{require_actor, resolve_pair},
        order_objects::{NewOrderRequest, OrderQueryFilter},
        quote_objects::EffectiveLimits,
    },
    helpers::{customer_identifiers, with_conflict_retry},
    traits::{EngineError, ExchangeGatewayDatabase, OrderTransition},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: accepting new orders, moving them through
/// `pending -> paid -> processing -> completed`, and cancelling them.
///
/// Every transition is applied together with its ledger entries as a single unit of work, and change events are
/// published only after that unit has committed.
pub struct OrderFlowApi<B> {
    db: B,
    config: EngineConfig,
    notifier: ChangeNotifier,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, config: EngineConfig, notifier: ChangeNotifier) -> Self {
        Self { db, config, notifier }
    }
}

impl<B> OrderFlowApi<B>
where B: ExchangeGatewayDatabase
{
    /// Accept a new order.
    ///
    /// The request is validated, the customer's restriction status checked, and the amount checked against the
    /// pair's current bounds before anything is written. The order is then stored in `pending` together with a hold
    /// on the receive-currency reserve for the full receive amount.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<Order, OrderRejection> {
        let customer_id = request.validate(&self.config)?;
        let now = Utc::now();
        let identifiers = customer_identifiers(request.customer_phone.as_deref(), request.customer_email.as_deref());
        if let Some(until) = self.restricted_until(&identifiers, now).await? {
            info!("🔄️📦️ Order from restricted customer {customer_id} turned away");
            return Err(OrderRejection::RestrictedCustomer { until });
        }
        let quote = resolve_pair(&self.db, &request.pair()).await?;
        let reserve = self.db.fetch_balance(&quote.pair.to).await?;
        let limits = EffectiveLimits::derive(&quote, reserve)?;
        limits.check(request.send_amount)?;
        let receive_amount = quote.rate.convert(request.send_amount).map_err(EngineError::from)?;
        let order = NewOrder {
            customer_name: request.customer_name.trim().to_string(),
            customer_email: request.customer_email.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            customer_phone: request.customer_phone.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            customer_id,
            send_method: quote.pair.from.clone(),
            receive_method: quote.pair.to.clone(),
            send_amount: request.send_amount,
            receive_amount,
            exchange_rate: quote.rate,
            payment_wallet: request.payment_wallet.trim().to_string(),
            created_at: now,
        };
        let db = &self.db;
        let prefix = self.config.order_id_prefix.as_str();
        let order = &order;
        let transition =
            with_conflict_retry(self.config.max_conflict_retries, move || db.insert_order(order.clone(), prefix))
                .await?;
        debug!(
            "🔄️📦️ Order {} accepted: {} {} for {} {}",
            transition.order.order_id,
            transition.order.send_amount,
            transition.order.send_method,
            transition.order.receive_amount,
            transition.order.receive_method
        );
        self.notifier.broadcast(EventType::NewOrder, &transition.order);
        self.publish_balance(&transition);
        Ok(transition.order)
    }

    /// Move an order to `target`.
    ///
    /// Forward steps follow `pending -> paid -> processing -> completed` (`paid` may be skipped). Reaching `completed`
    /// settles the order: its hold is released and the receive amount paid out, exactly once. A `target` of
    /// `cancelled` is the same as calling [`Self::cancel_order`].
    pub async fn advance_order(
        &self,
        order_id: &OrderId,
        target: OrderStatusType,
        actor: &str,
    ) -> Result<Order, OrderRejection> {
        if target == OrderStatusType::Cancelled {
            return self.cancel_order(order_id, actor).await;
        }
        let actor = require_actor(actor)?;
        let db = &self.db;
        let transition = with_conflict_retry(self.config.max_conflict_retries, move || async move {
            let order = db.fetch_order(order_id).await?.ok_or_else(|| EngineError::OrderNotFound(order_id.clone()))?;
            if !order.status.can_advance_to(target) {
                return Err(EngineError::InvalidTransition { order_id: order.order_id, from: order.status, to: target });
            }
            match target {
                OrderStatusType::Completed => db.complete_order(&order, actor).await,
                _ => db.advance_order(&order, target, actor).await,
            }
        })
        .await?;
        self.publish_transition(&transition, actor);
        Ok(transition.order)
    }

    /// Cancel an open order, releasing its hold and counting the cancellation against the customer.
    pub async fn cancel_order(&self, order_id: &OrderId, actor: &str) -> Result<Order, OrderRejection> {
        let actor = require_actor(actor)?;
        let db = &self.db;
        let policy = &self.config.restriction_policy;
        let transition = with_conflict_retry(self.config.max_conflict_retries, move || async move {
            let order = db.fetch_order(order_id).await?.ok_or_else(|| EngineError::OrderNotFound(order_id.clone()))?;
            if !order.status.can_cancel() {
                return Err(EngineError::InvalidTransition {
                    order_id: order.order_id,
                    from: order.status,
                    to: OrderStatusType::Cancelled,
                });
            }
            db.cancel_order(&order, actor, policy).await
        })
        .await?;
        if let Some(until) = transition.restriction.as_ref().and_then(|r| r.restricted_until) {
            if until > Utc::now() {
                info!("🔄️📦️ Customer {} is restricted until {until}", transition.order.customer_id);
            }
        }
        self.publish_transition(&transition, actor);
        Ok(transition.order)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderRejection> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderRejection::NotFound(order_id.clone()))
    }

    pub async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderRejection> {
        trace!("🔄️📦️ Searching orders. {filter}");
        Ok(self.db.search_orders(filter).await?)
    }

    pub async fn status_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusChange>, OrderRejection> {
        Ok(self.db.fetch_status_history(order_id).await?)
    }

    /// The latest active restriction across all of a customer's identifiers.
    async fn restricted_until(
        &self,
        identifiers: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, EngineError> {
        let mut until = None;
        for id in identifiers {
            let active = self.db.fetch_restriction(id).await?.and_then(|r| r.restricted_until).filter(|t| *t > now);
            until = until.max(active);
        }
        Ok(until)
    }

    fn publish_transition(&self, transition: &OrderTransition, actor: &str) {
        let order = &transition.order;
        if let Some(old_status) = transition.old_status {
            debug!("🔄️📦️ Order {} moved from {old_status} to {} by {actor}", order.order_id, order.status);
            let event = StatusChangeEvent {
                order_id: order.order_id.clone(),
                old_status,
                new_status: order.status,
                changed_by: actor.to_string(),
            };
            self.notifier.broadcast(EventType::StatusChange, &event);
        }
        self.notifier.broadcast(EventType::OrderUpdate, order);
        self.publish_balance(transition);
    }

    fn publish_balance(&self, transition: &OrderTransition) {
        if let Some(balance) = &transition.balance {
            self.notifier.broadcast(EventType::BalanceUpdate, &BalanceEvent::from(balance));
        }
    }
}
