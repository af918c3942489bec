use fx_common::Amount;

use crate::{
    db_types::{Balance, LedgerEntry, NewLedgerEntry, OrderId},
    traits::{EngineError, LedgerAdjustment, Reconciliation},
};

#[allow(async_fn_in_trait)]
pub trait WalletLedger {
    /// The available reserve for `currency`. Unknown currencies have a balance of zero.
    async fn fetch_balance(&self, currency: &str) -> Result<Amount, EngineError>;

    async fn fetch_balances(&self) -> Result<Vec<Balance>, EngineError>;

    /// Apply a single ledger entry and the matching balance update as one atomic unit.
    ///
    /// The entry amount must be positive. If the entry is a debit that would take the balance below zero,
    /// [`EngineError::InsufficientReserve`] is returned and nothing is written.
    async fn adjust(&self, entry: NewLedgerEntry) -> Result<LedgerAdjustment, EngineError>;

    /// Administrative override: record an `ADJUSTMENT` entry for the difference between the current balance and
    /// `amount`. Returns `None` if the balance already equals `amount`.
    async fn set_balance(
        &self,
        currency: &str,
        amount: Amount,
        actor: &str,
    ) -> Result<Option<LedgerAdjustment>, EngineError>;

    /// Every entry for `currency`, oldest first.
    async fn fetch_ledger_entries(&self, currency: &str) -> Result<Vec<LedgerEntry>, EngineError>;

    /// Every entry that references `order_id`, oldest first.
    async fn fetch_entries_for_order(&self, order_id: &OrderId) -> Result<Vec<LedgerEntry>, EngineError>;

    /// A consistent snapshot of the figures needed to check the ledger against the stored balance.
    async fn fetch_reconciliation(&self, currency: &str) -> Result<Reconciliation, EngineError>;
}
