use crate::{
    config::RestrictionPolicy,
    db_types::{NewOrder, Order, OrderId, OrderStatusChange, OrderStatusType},
    fx_api::order_objects::OrderQueryFilter,
    traits::{EngineError, OrderTransition},
};

/// Order persistence and the storage side of the order state machine.
///
/// The transition methods take the caller's snapshot of the order. Each applies its status change only if the
/// stored order still matches that snapshot (status and hold), so two racing requests can never both succeed.
/// When the snapshot is stale the whole unit of work is rolled back and either
/// [`EngineError::InvalidTransition`] (the order has since moved somewhere the target is not reachable from) or
/// [`EngineError::ConcurrencyConflict`] is returned.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, EngineError>;

    /// Orders matching `filter`, oldest first.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, EngineError>;

    /// The audit trail of status changes for the order, oldest first.
    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusChange>, EngineError>;

    /// In one unit of work: allocate an order id, place a `HOLD` for the receive amount, and persist the order in
    /// `pending`. If the reserve cannot cover the hold, [`EngineError::InsufficientReserve`] is returned and nothing
    /// is written.
    async fn insert_order(&self, order: NewOrder, id_prefix: &str) -> Result<OrderTransition, EngineError>;

    /// Move the order forward to a non-terminal status. No ledger activity.
    async fn advance_order(
        &self,
        order: &Order,
        target: OrderStatusType,
        actor: &str,
    ) -> Result<OrderTransition, EngineError>;

    /// Move a `processing` order to `completed`, retiring its hold with a `RELEASE` and settling it with a `PAYOUT`.
    async fn complete_order(&self, order: &Order, actor: &str) -> Result<OrderTransition, EngineError>;

    /// Cancel an open order, releasing its hold and recording the cancellation against the customer.
    async fn cancel_order(
        &self,
        order: &Order,
        actor: &str,
        policy: &RestrictionPolicy,
    ) -> Result<OrderTransition, EngineError>;
}
