//! Fixed-point amounts.
//!
//! Balances and liabilities are stored as integer stroops (10^-7 of a unit).
//! Arithmetic stays in the integer domain; conversion to a decimal happens
//! only when a value is rendered.

use serde::{Serialize, Serializer};
use std::fmt;

pub const STROOPS_PER_UNIT: i64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_stroops(stroops: i64) -> Self {
        Amount(stroops)
    }

    /// Converts a caller-supplied decimal to stroops, rounding to the nearest
    /// stroop. Non-finite or out-of-range values yield `None`.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * STROOPS_PER_UNIT as f64).round();
        if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
            return None;
        }
        Some(Amount(scaled as i64))
    }

    pub fn stroops(self) -> i64 {
        self.0
    }

    /// Whole and fractional parts are converted separately so large balances
    /// keep all seven fractional digits.
    pub fn to_decimal(self) -> f64 {
        let whole = self.0 / STROOPS_PER_UNIT;
        let fraction = self.0 % STROOPS_PER_UNIT;
        whole as f64 + fraction as f64 / STROOPS_PER_UNIT as f64
    }

    /// `balance - buying - selling`, computed on stroops.
    pub fn available(balance: Amount, buying: Amount, selling: Amount) -> Amount {
        Amount(balance.0.saturating_sub(buying.0).saturating_sub(selling.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let unit = STROOPS_PER_UNIT as u64;
        write!(f, "{}{}.{:07}", sign, magnitude / unit, magnitude % unit)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}
