//! Decimal amounts.
//!
//! Every amount exchanged with Mixin is a decimal string such as `"0.001"`.
//! [`Amount`] keeps it as a [`Decimal`] so sums are exact, and rounds fees up
//! (toward positive infinity) so a payment never falls short of the price.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::AmountError;

/// Number of fractional digits Mixin accepts for an asset amount.
pub const MIXIN_DECIMALS: u32 = 8;

/// Storage price per started [`STORAGE_STEP_BYTES`] block, in XIN.
pub const STORAGE_PRICE_STEP: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Size of one storage pricing block.
pub const STORAGE_STEP_BYTES: usize = 1024;

/// A non-negative decimal amount.
///
/// Serializes as a string. Deserializes from a string or a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wraps a decimal, rejecting negative values.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Negative`] if `value` is below zero.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Creates an amount from a mantissa and a scale: `(1, 2)` is `0.01`.
    #[must_use]
    pub const fn from_scaled(mantissa: u32, scale: u32) -> Self {
        Self(Decimal::from_parts(mantissa, 0, 0, false, scale))
    }

    /// Converts `units` of the smallest denomination of an asset with
    /// `decimals` fractional digits: `(1_000_000_000, 9)` is `1`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if `decimals` exceeds the supported
    /// scale.
    pub fn from_units(units: u64, decimals: u32) -> Result<Self, AmountError> {
        Decimal::try_from_i128_with_scale(i128::from(units), decimals)
            .map(|d| Self(d.normalize()))
            .map_err(|_| AmountError::Overflow)
    }

    /// Returns the inner decimal.
    #[must_use]
    pub const fn inner(&self) -> Decimal {
        self.0
    }

    /// Adds two amounts exactly.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the sum is out of range.
    pub fn checked_add(self, other: Self) -> Result<Self, AmountError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Rounds up to `dp` fractional digits.
    #[must_use]
    pub fn ceil_dp(self, dp: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::ToPositiveInfinity),
        )
    }

    /// Total fee for a system call: operation price plus the chain fee quoted
    /// in XIN, rounded up to [`MIXIN_DECIMALS`].
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the sum is out of range.
    pub fn total_fee(price: Self, xin: Self) -> Result<Self, AmountError> {
        Ok(price.checked_add(xin)?.ceil_dp(MIXIN_DECIMALS))
    }

    /// XIN cost of storing `len` bytes: one [`STORAGE_PRICE_STEP`] per started
    /// [`STORAGE_STEP_BYTES`] block.
    #[must_use]
    pub fn storage_cost(len: usize) -> Self {
        let steps = Decimal::from(len / STORAGE_STEP_BYTES + 1);
        Self(STORAGE_PRICE_STEP * steps)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| AmountError::Invalid(s.to_owned()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}
