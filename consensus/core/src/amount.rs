//! Fixed-point coin amounts
//!
//! An [`Amount`] counts nano units; one coin is 10^9 units. Arithmetic never
//! wraps: overdrawing is reported through `checked_*` and handled as a
//! validation failure by callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nano units per coin
pub const UNITS_PER_COIN: u64 = 1_000_000_000;

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub const fn from_coins(coins: u64) -> Self {
        Self(coins * UNITS_PER_COIN)
    }

    /// Thousandths of a coin, e.g. `from_milli(100)` is 0.1.
    pub const fn from_milli(milli: u64) -> Self {
        Self(milli * (UNITS_PER_COIN / 1000))
    }

    pub const fn units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_mul(self, factor: u64) -> Option<Amount> {
        self.0.checked_mul(factor).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Sum of `amounts`, `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Amount> {
        amounts.into_iter().try_fold(Amount::ZERO, |acc, a| acc.checked_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNITS_PER_COIN;
        let frac = self.0 % UNITS_PER_COIN;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:09}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_fraction() {
        assert_eq!(Amount::from_coins(1024).to_string(), "1024");
        assert_eq!(Amount::from_milli(100).to_string(), "0.1");
        assert_eq!(Amount::from_units(1_025_100_000_000).to_string(), "1025.1");
    }

    #[test]
    fn checked_arithmetic_never_wraps() {
        let a = Amount::from_coins(1);
        assert_eq!(a.checked_sub(Amount::from_coins(2)), None);
        assert_eq!(Amount::from_units(u64::MAX).checked_add(a), None);
        assert_eq!(a.saturating_sub(Amount::from_coins(5)), Amount::ZERO);
    }

    #[test]
    fn sum_reports_overflow() {
        let ok = Amount::checked_sum([Amount::from_coins(1), Amount::from_coins(2)]);
        assert_eq!(ok, Some(Amount::from_coins(3)));
        let overflow = Amount::checked_sum([Amount::from_units(u64::MAX), Amount::from_units(1)]);
        assert_eq!(overflow, None);
    }
}
