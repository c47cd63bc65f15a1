//! Fixed-precision money amounts
//!
//! Amounts are stored as whole hundredths so balances and payouts never pick
//! up floating point drift. On the wire they are decimal strings with exactly
//! two fractional digits (`"19.50"`).

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Non-negative money amount in hundredths
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount '{input}': {reason}")]
pub struct ParseAmountError {
    pub input: String,
    pub reason: &'static str,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiply by a factor expressed in hundredths (195 = 1.95x), rounding
    /// half up to the nearest cent.
    pub fn times_hundredths(self, factor: u64) -> Amount {
        let scaled = u128::from(self.0) * u128::from(factor);
        let rounded = (scaled + 50) / 100;
        Amount(u64::try_from(rounded).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseAmountError {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(fail("empty"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(fail("expected a non-negative decimal"));
        }
        if frac.len() > 2 {
            return Err(fail("more than two fractional digits"));
        }

        let whole_value: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| fail("too large"))?
        };
        let frac_value: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| fail("bad fraction"))? * 10,
            _ => frac.parse().map_err(|_| fail("bad fraction"))?,
        };

        whole_value
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_value))
            .map(Amount)
            .ok_or_else(|| fail("too large"))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> de::Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal with at most two fractional digits")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        v.checked_mul(100)
            .map(Amount)
            .ok_or_else(|| E::custom("amount too large"))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        let v = u64::try_from(v).map_err(|_| E::custom("amount must not be negative"))?;
        self.visit_u64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() || v < 0.0 {
            return Err(E::custom("amount must be a non-negative finite number"));
        }
        let scaled = v * 100.0;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return Err(E::custom("more than two fractional digits"));
        }
        if rounded > u64::MAX as f64 {
            return Err(E::custom("amount too large"));
        }
        Ok(Amount(rounded as u64))
    }
}
