//! Precision-safe decimal types for pool accounting.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors in token and price calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Token price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with token amounts in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// True if this price lies within `[min, max]` inclusive.
    #[inline]
    pub fn within(&self, min: Price, max: Price) -> bool {
        *self >= min && *self <= max
    }

    /// Midpoint of two prices, typically a min/max oracle pair.
    ///
    /// `None` when the sum of the pair is not representable.
    #[inline]
    pub fn midpoint(min: Price, max: Price) -> Option<Self> {
        min.0.checked_add(max.0).map(|sum| Self(sum / Decimal::TWO))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<Decimal>()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Token amount with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// amounts with prices in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Value of this amount at a given price: `amount * price`.
    ///
    /// `None` when the product is not representable.
    #[inline]
    pub fn value_at(&self, price: Price) -> Option<Amount> {
        self.0.checked_mul(price.0).map(Self)
    }

    /// Convert a value back into token units at a given price.
    ///
    /// `None` when the price is zero or the quotient is not
    /// representable.
    #[inline]
    pub fn units_at(&self, price: Price) -> Option<Amount> {
        if price.is_zero() {
            return None;
        }
        self.0.checked_div(price.0).map(Self)
    }

    /// Checked addition; `None` on overflow.
    #[inline]
    pub fn checked_add(&self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction; `None` when the result would go negative.
    #[inline]
    pub fn checked_sub(&self, rhs: Amount) -> Option<Amount> {
        if rhs.0 > self.0 {
            return None;
        }
        Some(Self(self.0 - rhs.0))
    }

    /// Saturating addition.
    #[inline]
    pub fn saturating_add(&self, rhs: Amount) -> Amount {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<Decimal>()?))
    }
}

impl From<Decimal> for Amount {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}
