//! Wallet currency.
//!
//! Amounts are whole minor units (cents). Every operation that could
//! overflow or go negative is checked; callers decide what a failure means.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of wallet currency in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credits(i64);

impl Credits {
    pub const ZERO: Credits = Credits(0);

    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// A strictly positive amount, as required for payments.
    pub fn positive(minor_units: i64) -> Option<Self> {
        (minor_units > 0).then_some(Self(minor_units))
    }

    pub const fn amount(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Credits) -> Option<Credits> {
        self.0.checked_add(other.0).map(Credits)
    }

    /// Subtract without allowing the result to drop below zero.
    pub fn checked_debit(self, other: Credits) -> Option<Credits> {
        self.0
            .checked_sub(other.0)
            .filter(|rest| *rest >= 0)
            .map(Credits)
    }

    /// Apply a signed adjustment, refusing a negative result.
    pub fn checked_adjust(self, delta: i64) -> Option<Credits> {
        self.0
            .checked_add(delta)
            .filter(|rest| *rest >= 0)
            .map(Credits)
    }

    pub fn negated(self) -> i64 {
        -self.0
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl From<Credits> for i64 {
    fn from(value: Credits) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_positive_rejects_zero_and_negative() {
        assert!(Credits::positive(0).is_none());
        assert!(Credits::positive(-5).is_none());
        assert_eq!(Credits::positive(5), Some(Credits::new(5)));
    }

    #[test_case(100, 40, Some(60))]
    #[test_case(100, 100, Some(0))]
    #[test_case(100, 101, None)]
    fn test_checked_debit(balance: i64, amount: i64, expected: Option<i64>) {
        let result = Credits::new(balance).checked_debit(Credits::new(amount));
        assert_eq!(result.map(|c| c.amount()), expected);
    }

    #[test]
    fn test_checked_add_overflow() {
        assert!(Credits::new(i64::MAX).checked_add(Credits::new(1)).is_none());
    }

    #[test_case(50, -50, Some(0))]
    #[test_case(50, -51, None)]
    #[test_case(50, 25, Some(75))]
    fn test_checked_adjust(balance: i64, delta: i64, expected: Option<i64>) {
        assert_eq!(
            Credits::new(balance).checked_adjust(delta).map(|c| c.amount()),
            expected
        );
    }

    #[test_case(0, "0.00")]
    #[test_case(5, "0.05")]
    #[test_case(12345, "123.45")]
    #[test_case(-250, "-2.50")]
    fn test_display(amount: i64, expected: &str) {
        assert_eq!(Credits::new(amount).to_string(), expected);
    }
}
