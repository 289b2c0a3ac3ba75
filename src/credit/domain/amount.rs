//! Whole-credit amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-negative number of credits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CreditAmount(u64);

impl CreditAmount {
    /// Zero credits.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw credit count.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw credit count.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Subtracts `other`, returning `None` when the result would be negative.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Adds `other`, clamping at the numeric ceiling.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for CreditAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
