//! Resource budget units.
//!
//! A `Budget` is the bounded computational allowance consumed
//! deterministically by one operation. Requests prepay their execution
//! budget at creation; the keeper supplies the remaining transaction
//! budget at execution time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic resource units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Budget(pub u64);

impl Budget {
    pub const ZERO: Self = Self(0);

    pub fn new(units: u64) -> Self {
        Self(units)
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked subtraction; `None` when `rhs` exceeds the budget.
    pub fn checked_sub(&self, rhs: Budget) -> Option<Budget> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn saturating_add(&self, rhs: Budget) -> Budget {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}u", self.0)
    }
}

impl From<u64> for Budget {
    fn from(units: u64) -> Self {
        Self(units)
    }
}
