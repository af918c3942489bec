use std::{fmt::Display, iter::Sum, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of decimal places carried by an [`Amount`].
pub const AMOUNT_SCALE: u32 = 2;

//--------------------------------------       Amount        ---------------------------------------------------------
/// A monetary amount in hundredths of the currency unit ("minor units").
///
/// Amounts are stored as integers so that the database can apply balance deltas atomically. Conversions to and
/// from [`Decimal`] are exact; anything finer than a hundredth must be rounded explicitly with
/// [`Amount::from_decimal_floor`] or [`Amount::from_decimal_ceil`].
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, a| acc + a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(pub String);

impl From<i64> for Amount {
    fn from(minor: i64) -> Self {
        Self(minor)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountConversionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let normalized = value.normalize();
        if normalized.scale() > AMOUNT_SCALE {
            return Err(AmountConversionError(format!(
                "{value} has more than {AMOUNT_SCALE} decimal places"
            )));
        }
        Self::from_scaled(normalized)
    }
}

impl FromStr for Amount {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| AmountConversionError(format!("{s}: {e}")))?;
        Self::try_from(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Whole currency units, e.g. `Amount::from_units(93)` is 93.00
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, AMOUNT_SCALE)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Round `value` toward zero to the nearest hundredth.
    pub fn from_decimal_floor(value: Decimal) -> Result<Self, AmountConversionError> {
        Self::from_scaled(value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero))
    }

    /// Round `value` away from zero to the nearest hundredth.
    pub fn from_decimal_ceil(value: Decimal) -> Result<Self, AmountConversionError> {
        Self::from_scaled(value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::AwayFromZero))
    }

    fn from_scaled(mut value: Decimal) -> Result<Self, AmountConversionError> {
        value.rescale(AMOUNT_SCALE);
        i64::try_from(value.mantissa())
            .map(Self)
            .map_err(|_| AmountConversionError(format!("{value} is out of range")))
    }
}
