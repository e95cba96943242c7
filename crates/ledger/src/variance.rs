//! Tolerance-based variance classification.
//!
//! The same verdict is used for cash shortages, closing-balance checks, tank
//! stock variances and delivery variances. The classifier only ever sees an
//! absolute tolerance; where that tolerance comes from (flat amount,
//! percentage of the book value, liters derived from a dip depth) is the
//! caller's business, see [`Tolerance`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::percentage;

/// Outcome of comparing an expected (book) value with an actual one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceResult {
    /// `expected - actual`. Positive means a shortage against the book value.
    pub variance: Decimal,
    pub variance_percentage: Decimal,
    pub is_normal: bool,
    pub tolerance_used: Decimal,
}

/// Compares `expected` with `actual` against an absolute `tolerance`.
///
/// `variance_percentage` is relative to `expected` when it is positive. With
/// a zero (or negative) baseline it is `100` if something was still observed
/// (`actual > 0`) and `0` otherwise.
///
/// ```rust
/// use ledger::variance::classify;
/// use rust_decimal::Decimal;
///
/// let result = classify(Decimal::from(1000), Decimal::from(1010), Decimal::from(20));
/// assert_eq!(result.variance, Decimal::from(-10));
/// assert!(result.is_normal);
/// ```
#[must_use]
pub fn classify(expected: Decimal, actual: Decimal, tolerance: Decimal) -> VarianceResult {
    let variance = expected - actual;
    let variance_percentage = if expected > Decimal::ZERO {
        percentage(variance.abs(), expected)
    } else if actual > Decimal::ZERO {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    VarianceResult {
        variance,
        variance_percentage,
        is_normal: variance.abs() <= tolerance,
        tolerance_used: tolerance,
    }
}

/// [`classify`] with a tolerance resolved against `expected`.
#[must_use]
pub fn classify_with(expected: Decimal, actual: Decimal, tolerance: &Tolerance) -> VarianceResult {
    classify(expected, actual, tolerance.resolve(expected))
}

/// Where an absolute tolerance comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tolerance {
    /// A fixed amount (currency units or liters).
    Flat { amount: Decimal },
    /// A percentage of the expected value.
    PercentOfExpected { percent: Decimal },
    /// `max(expected * percent / 100, flat)`, the shift cash policy.
    GreaterOf { percent: Decimal, flat: Decimal },
}

impl Tolerance {
    #[must_use]
    pub fn flat(amount: impl Into<Decimal>) -> Self {
        Self::Flat {
            amount: amount.into(),
        }
    }

    #[must_use]
    pub fn percent_of_expected(percent: impl Into<Decimal>) -> Self {
        Self::PercentOfExpected {
            percent: percent.into(),
        }
    }

    #[must_use]
    pub fn greater_of(percent: impl Into<Decimal>, flat: impl Into<Decimal>) -> Self {
        Self::GreaterOf {
            percent: percent.into(),
            flat: flat.into(),
        }
    }

    /// Absolute tolerance for a given expected value.
    #[must_use]
    pub fn resolve(&self, expected: Decimal) -> Decimal {
        match *self {
            Self::Flat { amount } => amount.abs(),
            Self::PercentOfExpected { percent } => share(expected, percent),
            Self::GreaterOf { percent, flat } => share(expected, percent).max(flat.abs()),
        }
    }
}

fn share(expected: Decimal, percent: Decimal) -> Decimal {
    expected
        .abs()
        .checked_mul(percent.abs())
        .map(|v| v / Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::MAX)
}

/// Book stock of a tank over a period:
/// `opening + deliveries - nozzle_outflow + test_returns`.
#[must_use]
pub fn tank_book_stock(
    opening: Decimal,
    deliveries: Decimal,
    nozzle_outflow: Decimal,
    test_returns: Decimal,
) -> Decimal {
    opening + deliveries - nozzle_outflow + test_returns
}
