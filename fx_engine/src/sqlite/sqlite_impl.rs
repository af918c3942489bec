//! `SqliteDatabase` is a concrete implementation of an exchange engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every composite operation runs in a single transaction whose first statement is a write, so SQLite's
//! writer lock is taken before anything is read. Lock timeouts surface as [`EngineError::ConcurrencyConflict`].
use std::fmt::Debug;

use chrono::Utc;
use fx_common::{helpers::normalize_currency_code, Amount, Rate};
use log::*;
use sqlx::SqlitePool;

use super::db::{currency_limits, exchange_rates, ledger, new_pool, orders, restrictions};
use crate::{
    config::RestrictionPolicy,
    db_types::{
        Balance,
        CurrencyLimit,
        CurrencyPair,
        CustomerRestriction,
        ExchangeRate,
        ExchangeRateHistory,
        LedgerEntry,
        NewLedgerEntry,
        NewOrder,
        Order,
        OrderId,
        OrderStatusChange,
        OrderStatusType,
    },
    fx_api::order_objects::OrderQueryFilter,
    traits::{
        CustomerRestrictions,
        EngineError,
        ExchangeGatewayDatabase,
        ExchangeRates,
        LedgerAdjustment,
        OrderManagement,
        OrderTransition,
        RateChange,
        Reconciliation,
        WalletLedger,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Opens (creating if necessary) the database at `url`. Call [`Self::migrate`] before first use.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, EngineError> {
        let pool = new_pool(url, max_connections).await?;
        info!("🗃️ Connected to {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), EngineError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ExchangeGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.pool.close().await;
        Ok(())
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_exchange_rate(&self, pair: &CurrencyPair) -> Result<Option<ExchangeRate>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let rate = exchange_rates::fetch_rate(pair, &mut conn).await?;
        Ok(rate)
    }

    async fn fetch_exchange_rates(&self) -> Result<Vec<ExchangeRate>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let rates = exchange_rates::fetch_rates(&mut conn).await?;
        Ok(rates)
    }

    async fn set_exchange_rate(
        &self,
        pair: &CurrencyPair,
        rate: Rate,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<RateChange, EngineError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let history = exchange_rates::insert_history(pair, rate, actor, reason, now, &mut tx).await?;
        let rate = exchange_rates::upsert_rate(pair, rate, actor, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Rate for {pair} set to {} by {actor}", rate.rate);
        Ok(RateChange { rate, history })
    }

    async fn fetch_rate_history(&self, pair: &CurrencyPair) -> Result<Vec<ExchangeRateHistory>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let history = exchange_rates::fetch_history(pair, &mut conn).await?;
        Ok(history)
    }

    async fn fetch_currency_limit(&self, pair: &CurrencyPair) -> Result<Option<CurrencyLimit>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let limit = currency_limits::fetch_limit(pair, &mut conn).await?;
        Ok(limit)
    }

    async fn set_currency_limit(
        &self,
        pair: &CurrencyPair,
        min: Amount,
        max: Amount,
        actor: &str,
    ) -> Result<CurrencyLimit, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let limit = currency_limits::upsert_limit(pair, min, max, actor, Utc::now(), &mut conn).await?;
        debug!("🗃️ Limits for {pair} set to [{min}, {max}] by {actor}");
        Ok(limit)
    }
}

impl WalletLedger for SqliteDatabase {
    async fn fetch_balance(&self, currency: &str) -> Result<Amount, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let balance = ledger::fetch_balance(&normalize_currency_code(currency), &mut conn).await?;
        Ok(balance)
    }

    async fn fetch_balances(&self) -> Result<Vec<Balance>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let balances = ledger::fetch_balances(&mut conn).await?;
        Ok(balances)
    }

    async fn adjust(&self, entry: NewLedgerEntry) -> Result<LedgerAdjustment, EngineError> {
        let mut tx = self.pool.begin().await?;
        let adjustment = ledger::adjust(entry, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ {} of {} {} recorded. Balance is now {}",
            adjustment.entry.entry_type, adjustment.entry.amount, adjustment.entry.currency, adjustment.balance.amount
        );
        Ok(adjustment)
    }

    async fn set_balance(
        &self,
        currency: &str,
        amount: Amount,
        actor: &str,
    ) -> Result<Option<LedgerAdjustment>, EngineError> {
        if amount.value() < 0 {
            return Err(EngineError::InvalidAmount(format!("A balance cannot be negative, got {amount}")));
        }
        let currency = normalize_currency_code(currency);
        let mut tx = self.pool.begin().await?;
        ledger::ensure_balance_row(&currency, Utc::now(), &mut tx).await?;
        let current = ledger::fetch_balance(&currency, &mut tx).await?;
        let delta = amount - current;
        if delta.is_zero() {
            tx.commit().await?;
            trace!("🗃️ {currency} balance is already {amount}. Nothing to do");
            return Ok(None);
        }
        let description = format!("Balance set from {current} to {amount}");
        let entry = NewLedgerEntry::adjustment(&currency, delta, actor, &description);
        let adjustment = ledger::adjust(entry, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {currency} balance set to {amount} by {actor}");
        Ok(Some(adjustment))
    }

    async fn fetch_ledger_entries(&self, currency: &str) -> Result<Vec<LedgerEntry>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::fetch_entries(&normalize_currency_code(currency), &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_entries_for_order(&self, order_id: &OrderId) -> Result<Vec<LedgerEntry>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::fetch_entries_for_order(order_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_reconciliation(&self, currency: &str) -> Result<Reconciliation, EngineError> {
        let currency = normalize_currency_code(currency);
        // A read transaction gives all three queries the same snapshot
        let mut tx = self.pool.begin().await?;
        let balance = ledger::fetch_balance(&currency, &mut tx).await?;
        let (ledger_total, net_holds) = ledger::ledger_totals(&currency, &mut tx).await?;
        let outstanding_holds = orders::outstanding_holds(&currency, &mut tx).await?;
        tx.commit().await?;
        Ok(Reconciliation { currency, balance, ledger_total, outstanding_holds, net_holds })
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(filter, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusChange>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let history = orders::fetch_status_history(order_id, &mut conn).await?;
        Ok(history)
    }

    async fn insert_order(&self, order: NewOrder, id_prefix: &str) -> Result<OrderTransition, EngineError> {
        let now = order.created_at;
        let mut tx = self.pool.begin().await?;
        let order_id = orders::next_order_id(id_prefix, now, &mut tx).await?;
        let hold = NewLedgerEntry::hold(&order_id, &order.receive_method, order.hold_amount(), &order.customer_id);
        let adjustment = ledger::adjust(hold, &mut tx).await?;
        let order = orders::insert_order(&order_id, order, &mut tx).await?;
        orders::insert_status_change(&order_id, None, OrderStatusType::Pending, &order.customer_id, now, &mut tx)
            .await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} saved. {} {} held", order.hold_amount, order.receive_method);
        Ok(OrderTransition::new(None, order).with_adjustment(adjustment))
    }

    async fn advance_order(
        &self,
        order: &Order,
        target: OrderStatusType,
        actor: &str,
    ) -> Result<OrderTransition, EngineError> {
        if target == OrderStatusType::Completed || target == OrderStatusType::Cancelled {
            return Err(EngineError::InvalidTransition {
                order_id: order.order_id.clone(),
                from: order.status,
                to: target,
            });
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let updated = orders::compare_and_set_status(order, target, order.hold_amount, actor, now, &mut tx).await?;
        let updated = match updated {
            Some(o) => o,
            None => return Err(orders::transition_failure(order, target, &mut tx).await?),
        };
        orders::insert_status_change(&updated.order_id, Some(order.status), target, actor, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} moved from {} to {target} by {actor}", updated.order_id, order.status);
        Ok(OrderTransition::new(Some(order.status), updated))
    }

    async fn complete_order(&self, order: &Order, actor: &str) -> Result<OrderTransition, EngineError> {
        let target = OrderStatusType::Completed;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let updated = orders::compare_and_set_status(order, target, Amount::ZERO, actor, now, &mut tx).await?;
        let updated = match updated {
            Some(o) => o,
            None => return Err(orders::transition_failure(order, target, &mut tx).await?),
        };
        let mut transition = OrderTransition::new(Some(order.status), updated);
        if order.hold_amount.is_positive() {
            let release = NewLedgerEntry::release(&order.order_id, &order.receive_method, order.hold_amount, actor);
            transition = transition.with_adjustment(ledger::adjust(release, &mut tx).await?);
        }
        let payout = NewLedgerEntry::payout(&order.order_id, &order.receive_method, order.receive_amount, actor);
        transition = transition.with_adjustment(ledger::adjust(payout, &mut tx).await?);
        orders::insert_status_change(&order.order_id, Some(order.status), target, actor, now, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order {} completed by {actor}. {} {} paid out",
            order.order_id, order.receive_amount, order.receive_method
        );
        Ok(transition)
    }

    async fn cancel_order(
        &self,
        order: &Order,
        actor: &str,
        policy: &RestrictionPolicy,
    ) -> Result<OrderTransition, EngineError> {
        let target = OrderStatusType::Cancelled;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let updated = orders::compare_and_set_status(order, target, Amount::ZERO, actor, now, &mut tx).await?;
        let updated = match updated {
            Some(o) => o,
            None => return Err(orders::transition_failure(order, target, &mut tx).await?),
        };
        let mut transition = OrderTransition::new(Some(order.status), updated);
        if order.hold_amount.is_positive() {
            let release = NewLedgerEntry::release(&order.order_id, &order.receive_method, order.hold_amount, actor);
            transition = transition.with_adjustment(ledger::adjust(release, &mut tx).await?);
        }
        orders::insert_status_change(&order.order_id, Some(order.status), target, actor, now, &mut tx).await?;
        // Counted against every identifier on the order; the primary one is reported back
        let mut restriction = None;
        for customer_id in order.customer_identifiers() {
            let r = restrictions::record_cancellation(&customer_id, Some(&order.order_id), policy, now, &mut tx).await?;
            restriction.get_or_insert(r);
        }
        tx.commit().await?;
        debug!(
            "🗃️ Order {} cancelled by {actor}. {} {} released",
            order.order_id, order.hold_amount, order.receive_method
        );
        Ok(match restriction {
            Some(r) => transition.with_restriction(r),
            None => transition,
        })
    }
}

impl CustomerRestrictions for SqliteDatabase {
    async fn fetch_restriction(&self, customer_id: &str) -> Result<Option<CustomerRestriction>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let restriction = restrictions::fetch_restriction(customer_id, &mut conn).await?;
        Ok(restriction)
    }

    async fn record_cancellation(
        &self,
        customer_id: &str,
        policy: &RestrictionPolicy,
    ) -> Result<CustomerRestriction, EngineError> {
        let mut tx = self.pool.begin().await?;
        let restriction = restrictions::record_cancellation(customer_id, None, policy, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(restriction)
    }
}
