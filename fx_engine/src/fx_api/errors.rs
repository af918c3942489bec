use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    traits::EngineError,
};

/// Why a request to the engine was turned down.
///
/// Every variant maps to a stable machine-readable [`code`](OrderRejection::code). Raw storage failures are logged
/// and reported only as [`OrderRejection::Internal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderRejection {
    #[error("{0}")]
    Validation(String),
    #[error("{from} to {to} is not a supported exchange")]
    UntradablePair { from: String, to: String },
    #[error("There is not enough {currency} in reserve to honour this request")]
    InsufficientReserve { currency: String },
    #[error("This customer cannot place new orders until {until}")]
    RestrictedCustomer { until: DateTime<Utc> },
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} does not exist")]
    NotFound(OrderId),
    #[error("The request clashed with another update. Please try again")]
    ConcurrencyConflict,
    #[error("An internal error occurred")]
    Internal,
}

impl OrderRejection {
    pub fn code(&self) -> &'static str {
        match self {
            OrderRejection::Validation(_) => "VALIDATION_ERROR",
            OrderRejection::UntradablePair { .. } => "UNTRADABLE_PAIR",
            OrderRejection::InsufficientReserve { .. } => "INSUFFICIENT_RESERVE",
            OrderRejection::RestrictedCustomer { .. } => "RESTRICTED_CUSTOMER",
            OrderRejection::InvalidTransition { .. } => "INVALID_TRANSITION",
            OrderRejection::NotFound(_) => "NOT_FOUND",
            OrderRejection::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            OrderRejection::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn reason(&self) -> RejectionReason {
        RejectionReason { code: self.code().to_string(), message: self.to_string() }
    }
}

/// Serializable form of an [`OrderRejection`] for transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReason {
    pub code: String,
    pub message: String,
}

impl From<EngineError> for OrderRejection {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::ConcurrencyConflict(reason) => {
                warn!("🔄️ Giving up after repeated concurrency conflicts: {reason}");
                OrderRejection::ConcurrencyConflict
            },
            EngineError::InsufficientReserve { currency, .. } => OrderRejection::InsufficientReserve { currency },
            EngineError::OrderNotFound(id) => OrderRejection::NotFound(id),
            EngineError::InvalidTransition { order_id, from, to } => {
                OrderRejection::InvalidTransition { order_id, from, to }
            },
            EngineError::InvalidAmount(msg) | EngineError::InvalidRate(msg) => OrderRejection::Validation(msg),
            EngineError::DatabaseError(msg) => {
                error!("🔄️ Storage failure: {msg}");
                OrderRejection::Internal
            },
        }
    }
}
