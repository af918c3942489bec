use crate::{config::RestrictionPolicy, db_types::CustomerRestriction, traits::EngineError};

#[allow(async_fn_in_trait)]
pub trait CustomerRestrictions {
    /// The restriction record for the (already normalized) customer identifier, if the customer has ever cancelled.
    async fn fetch_restriction(&self, customer_id: &str) -> Result<Option<CustomerRestriction>, EngineError>;

    /// Record a cancellation outside of an order transition and apply `policy` to the customer's recent history.
    async fn record_cancellation(
        &self,
        customer_id: &str,
        policy: &RestrictionPolicy,
    ) -> Result<CustomerRestriction, EngineError>;
}
