use fx_common::Amount;
use serde::{Deserialize, Serialize};

use crate::db_types::{
    Balance,
    CustomerRestriction,
    ExchangeRate,
    ExchangeRateHistory,
    LedgerEntry,
    Order,
    OrderStatusType,
};

/// The result of a single ledger movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAdjustment {
    pub entry: LedgerEntry,
    /// The balance row immediately after the entry was applied
    pub balance: Balance,
}

/// Everything that changed in one order transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTransition {
    /// `None` when the order was just created
    pub old_status: Option<OrderStatusType>,
    pub order: Order,
    /// Ledger entries written by the transition, in the order they were applied
    pub entries: Vec<LedgerEntry>,
    /// The receive-currency balance after the transition, if the ledger was touched
    pub balance: Option<Balance>,
    /// The customer's restriction record, if the transition was a cancellation
    pub restriction: Option<CustomerRestriction>,
}

impl OrderTransition {
    pub fn new(old_status: Option<OrderStatusType>, order: Order) -> Self {
        Self { old_status, order, entries: Vec::new(), balance: None, restriction: None }
    }

    pub fn with_adjustment(mut self, adjustment: LedgerAdjustment) -> Self {
        self.entries.push(adjustment.entry);
        self.balance = Some(adjustment.balance);
        self
    }

    pub fn with_restriction(mut self, restriction: CustomerRestriction) -> Self {
        self.restriction = Some(restriction);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateChange {
    pub rate: ExchangeRate,
    pub history: ExchangeRateHistory,
}

/// Figures for checking the ledger against the stored balance for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub currency: String,
    /// The stored balance
    pub balance: Amount,
    /// Credits minus debits over every ledger entry for the currency
    pub ledger_total: Amount,
    /// Sum of `hold_amount` over orders that are not yet completed or cancelled
    pub outstanding_holds: Amount,
    /// `HOLD` entries minus `RELEASE` entries
    pub net_holds: Amount,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.balance == self.ledger_total && self.outstanding_holds == self.net_holds
    }
}
