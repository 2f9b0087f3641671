//! Fixed-point monetary amounts.

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Monetary amount in the smallest unit (cents), two decimal places.
///
/// Signed: ledger balances may legitimately go negative (overpayment).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Build from whole currency units (e.g. `Money::from_major(1000)` is 1000.00).
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiply by a whole count (e.g. semesters).
    pub fn times(&self, count: u32) -> Money {
        Money(self.0 * i64::from(count))
    }
}

impl core::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl core::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl core::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_and_scaling() {
        let tuition = Money::from_major(1000);
        let exam = Money::from_major(100);
        let per_semester = tuition + exam;
        assert_eq!(per_semester.times(2), Money::from_major(2200));
        assert_eq!(per_semester - exam, tuition);
    }

    #[test]
    fn display_is_two_decimal_places() {
        assert_eq!(Money::from_cents(225_000).to_string(), "2250.00");
        assert_eq!(Money::from_cents(1_05).to_string(), "1.05");
        assert_eq!(Money::from_cents(-50).to_string(), "-0.50");
    }
}
