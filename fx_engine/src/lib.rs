//! FX Engine
//!
//! The FX engine runs the order lifecycle and reserve settlement for a multi-rail currency exchange. Customers send
//! one currency and receive another at a per-pair rate; the engine makes sure the exchange can always honour what it
//! has promised.
//!
//! The library is divided into these main sections:
//! 1. The public API ([`fx_api`]): [`OrderFlowApi`] for the order state machine, [`ExchangeRateApi`] for rates and
//!    limits, [`WalletApi`] for the reserve ledger and [`RestrictionApi`] for the cancellation-abuse tracker.
//! 2. Backend contracts ([`traits`]) and the bundled SQLite backend ([`SqliteDatabase`]). You should never need to
//!    access the database directly. The exception is the data types, defined in [`db_types`].
//! 3. Change notifications ([`events`]). Every committed change is published on a [`events::ChangeNotifier`]. Live
//!    transports subscribe to it, and async hooks can be attached with [`events::EventHooks`].
pub mod config;
pub mod db_types;
pub mod events;
pub mod fx_api;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use config::{EngineConfig, RestrictionPolicy};
pub use fx_api::{
    errors::{OrderRejection, RejectionReason},
    exchange_rate_api::ExchangeRateApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    quote_objects,
    restriction_api::RestrictionApi,
    wallet_api::WalletApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CustomerRestrictions,
    EngineError,
    ExchangeGatewayDatabase,
    ExchangeRates,
    OrderManagement,
    WalletLedger,
};
