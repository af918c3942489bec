use std::fmt::Display;

use chrono::{DateTime, Utc};
use fx_common::{Amount, Rate};
use serde::{Deserialize, Serialize};

use crate::db_types::{Balance, OrderId, OrderStatusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OrderUpdate,
    NewOrder,
    NewMessage,
    StatusChange,
    ExchangeRateUpdate,
    CurrencyLimitUpdate,
    BalanceUpdate,
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::OrderUpdate => "order_update",
            EventType::NewOrder => "new_order",
            EventType::NewMessage => "new_message",
            EventType::StatusChange => "status_change",
            EventType::ExchangeRateUpdate => "exchange_rate_update",
            EventType::CurrencyLimitUpdate => "currency_limit_update",
            EventType::BalanceUpdate => "balance_update",
        };
        write!(f, "{s}")
    }
}

/// The envelope delivered to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl LiveEvent {
    pub fn new(event_type: EventType, data: serde_json::Value) -> Self {
        Self { event_type, data, timestamp: Utc::now() }
    }

    /// Decode the payload into one of the typed event structs.
    pub fn payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub order_id: OrderId,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
    pub changed_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub currency: String,
    pub balance: Amount,
}

impl From<&Balance> for BalanceEvent {
    fn from(b: &Balance) -> Self {
        Self { currency: b.currency.clone(), balance: b.amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateEvent {
    pub from_currency: String,
    pub to_currency: String,
    pub old_rate: Option<Rate>,
    pub new_rate: Rate,
    pub changed_by: String,
    pub reason: Option<String>,
}
