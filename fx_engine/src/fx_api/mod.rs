//! The public face of the exchange engine.
//!
//! Each API struct is generic over a backend implementing the traits in [`crate::traits`], and reports failures to
//! callers as [`errors::OrderRejection`].
pub mod errors;
pub mod exchange_rate_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod quote_objects;
pub mod restriction_api;
pub mod wallet_api;
