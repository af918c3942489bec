use fx_common::{Amount, AmountConversionError, RateConversionError};
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    traits::{CustomerRestrictions, ExchangeRates, OrderManagement, WalletLedger},
};

/// The highest level of behaviour for backends supporting the exchange engine.
#[allow(async_fn_in_trait)]
pub trait ExchangeGatewayDatabase: Clone + ExchangeRates + WalletLedger + OrderManagement + CustomerRestrictions {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The unit of work lost a race with a concurrent update: {0}")]
    ConcurrencyConflict(String),
    #[error("Insufficient {currency} reserve. Requested {requested}, but only {available} is available")]
    InsufficientReserve { currency: String, requested: Amount, available: Amount },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),
}

/// SQLite primary result codes for lock contention (`SQLITE_BUSY`, `SQLITE_LOCKED`).
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut => EngineError::ConcurrencyConflict(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let primary = db_err.code().and_then(|c| c.parse::<i32>().ok()).map(|c| c & 0xff);
                match primary {
                    Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => EngineError::ConcurrencyConflict(e.to_string()),
                    _ => EngineError::DatabaseError(e.to_string()),
                }
            },
            _ => EngineError::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for EngineError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        EngineError::DatabaseError(e.to_string())
    }
}

impl From<AmountConversionError> for EngineError {
    fn from(e: AmountConversionError) -> Self {
        EngineError::InvalidAmount(e.to_string())
    }
}

impl From<RateConversionError> for EngineError {
    fn from(e: RateConversionError) -> Self {
        EngineError::InvalidRate(e.to_string())
    }
}
