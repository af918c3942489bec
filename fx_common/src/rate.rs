use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::{Amount, AmountConversionError};

/// Number of decimal places carried by a [`Rate`].
pub const RATE_SCALE: u32 = 8;

//--------------------------------------        Rate         ---------------------------------------------------------
/// An exchange rate: how many units of the receive currency one unit of the send currency buys.
///
/// Stored as an integer count of 10^-8 units.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Rate(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateConversionError {
    #[error("Value cannot be represented as an exchange rate: {0}")]
    InvalidRate(String),
    #[error("{0}")]
    Amount(#[from] AmountConversionError),
}

impl TryFrom<Decimal> for Rate {
    type Error = RateConversionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let mut normalized = value.normalize();
        if normalized.scale() > RATE_SCALE {
            return Err(RateConversionError::InvalidRate(format!(
                "{value} has more than {RATE_SCALE} decimal places"
            )));
        }
        normalized.rescale(RATE_SCALE);
        i64::try_from(normalized.mantissa())
            .map(Self)
            .map_err(|_| RateConversionError::InvalidRate(format!("{value} is out of range")))
    }
}

impl FromStr for Rate {
    type Err = RateConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|e| RateConversionError::InvalidRate(format!("{s}: {e}")))?;
        Self::try_from(value)
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Rate {
    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, RATE_SCALE).normalize()
    }

    /// The receive amount for `send`, rounded toward zero to the nearest hundredth.
    pub fn convert(&self, send: Amount) -> Result<Amount, RateConversionError> {
        let product = send
            .to_decimal()
            .checked_mul(self.to_decimal())
            .ok_or_else(|| RateConversionError::InvalidRate(format!("{send} x {self} overflows")))?;
        Ok(Amount::from_decimal_floor(product)?)
    }

    /// `receive / rate`, unrounded. Takes a `Decimal` so callers can work past the range of [`Amount`]. Returns
    /// `None` for a non-positive rate or on overflow.
    pub fn invert(&self, receive: Decimal) -> Option<Decimal> {
        if !self.is_positive() {
            return None;
        }
        receive.checked_div(self.to_decimal())
    }
}
