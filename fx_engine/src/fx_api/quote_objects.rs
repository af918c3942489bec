use fx_common::{Amount, Rate};
use serde::{Deserialize, Serialize};

use crate::{db_types::CurrencyPair, fx_api::errors::OrderRejection, traits::EngineError};

/// The rate and configured limits in force for an ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairQuote {
    pub pair: CurrencyPair,
    pub rate: Rate,
    pub min_amount: Amount,
    pub max_amount: Amount,
}

/// Send-amount bounds for a pair, given the receive-currency reserve at the moment of the request.
///
/// These are recomputed for every request and never cached. They are advisory: the ledger's non-negative check at
/// commit time has the final say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveLimits {
    pub pair: CurrencyPair,
    pub rate: Rate,
    pub min_amount: Amount,
    pub max_amount: Amount,
    /// The receive-currency reserve the bounds were derived from
    pub reserve: Amount,
}

impl EffectiveLimits {
    /// * The minimum is the configured minimum, raised if necessary to the smallest send amount whose receive amount
    ///   is non-zero after rounding.
    /// * The maximum is the largest send amount, up to the configured maximum, whose rounded-down receive amount does
    ///   not exceed `reserve`.
    pub fn derive(quote: &PairQuote, reserve: Amount) -> Result<Self, EngineError> {
        let rate = quote.rate;
        if !rate.is_positive() {
            return Err(EngineError::InvalidRate(format!("The rate for {} is not positive", quote.pair)));
        }
        let min_amount = quote.min_amount.max(smallest_nonzero_send(rate)?);
        let max_amount = largest_send_within(rate, reserve, quote.max_amount)?;
        Ok(Self { pair: quote.pair.clone(), rate, min_amount, max_amount, reserve })
    }

    /// True when no send amount is currently acceptable.
    pub fn is_exhausted(&self) -> bool {
        self.max_amount < self.min_amount
    }

    pub fn check(&self, send_amount: Amount) -> Result<(), OrderRejection> {
        if self.is_exhausted() {
            return Err(OrderRejection::Validation(format!(
                "{} is temporarily unavailable: the maximum of {} is below the minimum of {}",
                self.pair, self.max_amount, self.min_amount
            )));
        }
        if send_amount < self.min_amount || send_amount > self.max_amount {
            return Err(OrderRejection::Validation(format!(
                "The amount to send must be between {} and {} {}",
                self.min_amount, self.max_amount, self.pair.from
            )));
        }
        Ok(())
    }
}

const ONE_HUNDREDTH: Amount = Amount::from_minor(1);

fn smallest_nonzero_send(rate: Rate) -> Result<Amount, EngineError> {
    let exact = ONE_HUNDREDTH.to_decimal() / rate.to_decimal();
    let mut send = Amount::from_decimal_ceil(exact)?;
    while rate.convert(send)?.is_zero() {
        send += ONE_HUNDREDTH;
    }
    Ok(send)
}

/// Largest 2dp `s <= cap` with `floor2(s * rate) <= reserve`, i.e. the largest `s` strictly below
/// `(reserve + 0.01) / rate`. The bound is worked out in `Decimal` and clamped to `cap` before it becomes an amount,
/// so large reserves and tiny rates cannot overflow.
fn largest_send_within(rate: Rate, reserve: Amount, cap: Amount) -> Result<Amount, EngineError> {
    if reserve.value() < 0 || cap.value() <= 0 {
        return Ok(Amount::ZERO);
    }
    let headroom = reserve.to_decimal() + ONE_HUNDREDTH.to_decimal();
    let bound = rate
        .invert(headroom)
        .ok_or_else(|| EngineError::InvalidRate(format!("Cannot divide by a rate of {rate}")))?;
    if bound > cap.to_decimal() {
        return Ok(cap);
    }
    let mut send = Amount::from_decimal_ceil(bound)? - ONE_HUNDREDTH;
    while send.is_positive() && rate.convert(send)? > reserve {
        send -= ONE_HUNDREDTH;
    }
    Ok(send.max(Amount::ZERO))
}
