mod amount;
mod rate;

pub mod helpers;
pub mod op;

pub use amount::{Amount, AmountConversionError, AMOUNT_SCALE};
pub use rate::{Rate, RateConversionError, RATE_SCALE};
