use std::fmt::Debug;

use fx_common::{helpers::normalize_currency_code, Amount};
use log::*;

use crate::{
    config::EngineConfig,
    db_types::{Balance, LedgerEntry, NewLedgerEntry, OrderId},
    events::{BalanceEvent, ChangeNotifier, EventType},
    fx_api::{errors::OrderRejection, exchange_rate_api::require_actor},
    helpers::with_conflict_retry,
    traits::{LedgerAdjustment, Reconciliation, WalletLedger},
};

/// Read access to the reserve ledger, plus the administrative calls that top up or correct reserves.
pub struct WalletApi<B> {
    db: B,
    config: EngineConfig,
    notifier: ChangeNotifier,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B, config: EngineConfig, notifier: ChangeNotifier) -> Self {
        Self { db, config, notifier }
    }
}

impl<B> WalletApi<B>
where B: WalletLedger
{
    /// The available reserve for `currency`. Unknown currencies have a zero balance.
    pub async fn balance(&self, currency: &str) -> Result<Amount, OrderRejection> {
        Ok(self.db.fetch_balance(currency).await?)
    }

    pub async fn balances(&self) -> Result<Vec<Balance>, OrderRejection> {
        Ok(self.db.fetch_balances().await?)
    }

    pub async fn entries(&self, currency: &str) -> Result<Vec<LedgerEntry>, OrderRejection> {
        Ok(self.db.fetch_ledger_entries(currency).await?)
    }

    pub async fn entries_for_order(&self, order_id: &OrderId) -> Result<Vec<LedgerEntry>, OrderRejection> {
        Ok(self.db.fetch_entries_for_order(order_id).await?)
    }

    pub async fn reconcile(&self, currency: &str) -> Result<Reconciliation, OrderRejection> {
        let report = self.db.fetch_reconciliation(currency).await?;
        if !report.is_balanced() {
            error!("🔄️💰️ {} ledger does not reconcile: {report:?}", report.currency);
        }
        Ok(report)
    }

    /// Apply a single ledger entry. Debits that would overdraw the reserve are rejected with
    /// [`OrderRejection::InsufficientReserve`] and nothing is written.
    pub async fn adjust(&self, entry: NewLedgerEntry) -> Result<LedgerAdjustment, OrderRejection> {
        require_actor(&entry.created_by)?;
        if !entry.amount.is_positive() {
            return Err(OrderRejection::Validation(format!("Ledger amounts must be positive, got {}", entry.amount)));
        }
        if normalize_currency_code(&entry.currency).is_empty() {
            return Err(OrderRejection::Validation("A currency is required".into()));
        }
        let db = &self.db;
        let entry = &entry;
        let adjustment = with_conflict_retry(self.config.max_conflict_retries, move || db.adjust(entry.clone())).await?;
        self.notifier.broadcast(EventType::BalanceUpdate, &BalanceEvent::from(&adjustment.balance));
        Ok(adjustment)
    }

    /// Administrative override of the reserve for `currency`, recorded as an `ADJUSTMENT` for the difference.
    /// Returns the new balance.
    pub async fn set_balance(&self, currency: &str, amount: Amount, actor: &str) -> Result<Amount, OrderRejection> {
        let actor = require_actor(actor)?;
        let code = normalize_currency_code(currency);
        if code.is_empty() {
            return Err(OrderRejection::Validation("A currency is required".into()));
        }
        if amount.value() < 0 {
            return Err(OrderRejection::Validation(format!("A balance cannot be negative, got {amount}")));
        }
        let db = &self.db;
        let code_ref = code.as_str();
        let adjustment =
            with_conflict_retry(self.config.max_conflict_retries, move || db.set_balance(code_ref, amount, actor))
                .await?;
        match adjustment {
            Some(adj) => {
                info!("🔄️💰️ {code} reserve set to {} by {actor}", adj.balance.amount);
                self.notifier.broadcast(EventType::BalanceUpdate, &BalanceEvent::from(&adj.balance));
                Ok(adj.balance.amount)
            },
            None => Ok(amount),
        }
    }
}
