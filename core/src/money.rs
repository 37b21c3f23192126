//! Fixed-point money.
//!
//! Amounts are stored as integer cents, never binary floating point. This
//! mirrors `decimal(12,2)` storage: two fractional digits, half-up rounding
//! on every derived value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An amount of money in a single currency, stored as integer cents.
///
/// `Money` does not carry a currency code itself — the aggregate that holds
/// an amount also holds a `currency_code` field (ISO-4217) alongside it, the
/// same way the original ledger pairs `supplier_cost_total`/`currency_code`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

/// Error returned when a money value cannot be constructed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The decimal string did not parse as a two-fractional-digit amount.
    #[error("invalid money literal: {0}")]
    InvalidLiteral(String),
}

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Construct from a whole number of cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Whether this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Clamp to zero if negative.
    #[must_use]
    pub const fn at_least_zero(self) -> Self {
        if self.0 < 0 { Self::ZERO } else { self }
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Multiply by a percentage expressed as hundredths of a percent (e.g.
    /// `1500` for 15%, `2150` for 21.5%) and round half-up to the nearest
    /// cent. Pure integer arithmetic throughout; this is the core
    /// `percent_of` and `marked_up_by` are built on.
    #[must_use]
    pub fn percent_of_hundredths(self, pct_hundredths: i64) -> Self {
        let numerator = i128::from(self.0) * i128::from(pct_hundredths);
        Self(div_round_half_up(numerator, 10_000))
    }

    /// Multiply by a percentage (e.g. `21.5` for 21.5%) and round half-up to
    /// the nearest cent.
    ///
    /// `pct` is converted to hundredths-of-a-percent once, up front; the
    /// multiply-and-round against the money amount itself is done by
    /// [`Self::percent_of_hundredths`] in pure integer arithmetic, never
    /// binary floating point.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn percent_of(self, pct: f64) -> Self {
        let pct_hundredths = (pct * 100.0).round() as i64;
        self.percent_of_hundredths(pct_hundredths)
    }

    /// `self * (1 + pct/100)`, rounded half-up.
    #[must_use]
    pub fn marked_up_by(self, pct: f64) -> Self {
        self.saturating_add(self.percent_of(pct))
    }
}

/// Round-half-up (away from zero) integer division.
#[allow(clippy::cast_possible_truncation)]
fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    };
    rounded as i64
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.0 < 0;
        let abs = self.0.unsigned_abs();
        if negative {
            write!(f, "-{}.{:02}", abs / 100, abs % 100)
        } else {
            write!(f, "{}.{:02}", abs / 100, abs % 100)
        }
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Parses a decimal string with exactly two fractional digits, e.g.
    /// `"1500.00"` or `"-12.50"`. This is the wire format spec.md §6
    /// requires ("serialized as a string with exactly two decimal places").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let negative = s.starts_with('-');
        let unsigned = s.strip_prefix('-').unwrap_or(s);
        let (whole, frac) = unsigned
            .split_once('.')
            .ok_or_else(|| MoneyError::InvalidLiteral(s.to_string()))?;
        if frac.len() != 2 || !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyError::InvalidLiteral(s.to_string()));
        }
        let whole: i64 = whole
            .parse()
            .map_err(|_| MoneyError::InvalidLiteral(s.to_string()))?;
        let frac: i64 = frac
            .parse()
            .map_err(|_| MoneyError::InvalidLiteral(s.to_string()))?;
        let cents = whole * 100 + frac;
        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl std::ops::Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::from_cents(150_000).to_string(), "1500.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
    }

    #[test]
    fn parses_round_trip() {
        let m: Money = "1500.00".parse().unwrap();
        assert_eq!(m.cents(), 150_000);
        assert_eq!(m.to_string(), "1500.00");
    }

    #[test]
    fn rejects_malformed_literals() {
        assert!("1500".parse::<Money>().is_err());
        assert!("1500.0".parse::<Money>().is_err());
        assert!("abc.00".parse::<Money>().is_err());
    }

    #[test]
    fn marked_up_by_zero_is_identity() {
        let price = Money::from_cents(123_45);
        assert_eq!(price.marked_up_by(0.0), price);
    }

    #[test]
    fn percent_of_rounds_half_up() {
        // 0.005 * 100 cents = 0.5 cents -> rounds to 1
        let m = Money::from_cents(100);
        assert_eq!(m.percent_of(0.5).cents(), 1);
    }

    #[test]
    fn percent_of_hundredths_matches_percent_of() {
        let m = Money::from_cents(123_45);
        // 2150 hundredths-of-a-percent == 21.5%
        assert_eq!(m.percent_of_hundredths(2150), m.percent_of(21.5));
    }

    #[test]
    fn percent_of_hundredths_never_overflows_i64_intermediate() {
        // i64::MAX cents at a large percentage would overflow an i64
        // intermediate; the i128 numerator in percent_of_hundredths must not.
        let m = Money::from_cents(i64::MAX / 2);
        assert_eq!(m.percent_of_hundredths(20_000).cents(), m.cents() * 2);
    }
}
