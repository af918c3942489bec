use std::fmt::Debug;

use chrono::Utc;

use crate::{
    config::RestrictionPolicy,
    db_types::CustomerRestriction,
    fx_api::errors::OrderRejection,
    helpers::normalize_customer_id,
    traits::CustomerRestrictions,
};

/// Lookups against the cancellation-abuse tracker. Identifiers are normalized before use, so callers may pass an
/// email address or phone number as the customer typed it.
pub struct RestrictionApi<B> {
    db: B,
    policy: RestrictionPolicy,
}

impl<B> Debug for RestrictionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RestrictionApi")
    }
}

impl<B> RestrictionApi<B> {
    pub fn new(db: B, policy: RestrictionPolicy) -> Self {
        Self { db, policy }
    }
}

impl<B> RestrictionApi<B>
where B: CustomerRestrictions
{
    pub async fn is_restricted(&self, identifier: &str) -> Result<bool, OrderRejection> {
        let restriction = self.restriction(identifier).await?;
        Ok(restriction.map(|r| r.is_active_at(Utc::now())).unwrap_or(false))
    }

    pub async fn restriction(&self, identifier: &str) -> Result<Option<CustomerRestriction>, OrderRejection> {
        Ok(self.db.fetch_restriction(&normalize_customer_id(identifier)).await?)
    }

    /// Count a cancellation that happened outside the order flow (order cancellations are counted automatically).
    pub async fn record_cancellation(&self, identifier: &str) -> Result<CustomerRestriction, OrderRejection> {
        let customer_id = normalize_customer_id(identifier);
        if customer_id.is_empty() {
            return Err(OrderRejection::Validation("A customer identifier is required".into()));
        }
        Ok(self.db.record_cancellation(&customer_id, &self.policy).await?)
    }
}
