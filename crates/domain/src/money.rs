//! Rental pricing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An amount in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from the smallest currency unit.
    pub fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns the raw amount.
    pub fn amount(&self) -> i64 {
        self.0
    }

    /// Multiplies a daily price by a number of days. `None` on overflow.
    pub fn times(&self, days: i64) -> Option<Money> {
        self.0.checked_mul(days).map(Money)
    }

    /// Total price for renting from `date_from` to `date_to` at this daily rate.
    /// `None` when the total does not fit.
    pub fn for_period(&self, date_from: NaiveDate, date_to: NaiveDate) -> Option<Money> {
        self.times(whole_days_between(date_from, date_to))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of whole days from `from` to `to`.
///
/// Ordering is not checked: a reversed range yields a negative count.
pub fn whole_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
