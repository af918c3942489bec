//! # Backend contracts
//!
//! This module defines the behaviour a storage backend must expose to drive the exchange engine. The public API
//! structs in [`crate::fx_api`] are generic over these traits; [`crate::SqliteDatabase`] is the bundled
//! implementation.
//!
//! * [`ExchangeRates`] stores per-pair exchange rates (with an immutable change history) and per-pair amount limits.
//! * [`WalletLedger`] is the only component allowed to move reserve balances. Every movement is one immutable
//!   ledger entry plus one balance update, applied atomically. Balances never go negative.
//! * [`OrderManagement`] persists orders and runs each status transition, together with its ledger entries and
//!   restriction bookkeeping, as a single unit of work.
//! * [`CustomerRestrictions`] tracks cancellations per customer and the cooling-off restrictions they trigger.
//! * [`ExchangeGatewayDatabase`] ties them together.
//!
//! Backends report failures as [`EngineError`]. Lost lock races must be reported as
//! [`EngineError::ConcurrencyConflict`] so that callers can retry them.
mod customer_restrictions;
mod data_objects;
mod exchange_gateway_database;
mod exchange_rates;
mod order_management;
mod wallet_ledger;

pub use customer_restrictions::CustomerRestrictions;
pub use data_objects::{LedgerAdjustment, OrderTransition, RateChange, Reconciliation};
pub use exchange_gateway_database::{EngineError, ExchangeGatewayDatabase};
pub use exchange_rates::ExchangeRates;
pub use order_management::OrderManagement;
pub use wallet_ledger::WalletLedger;
