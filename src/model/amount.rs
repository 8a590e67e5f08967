//! Amount type for handling monetary values.
//!
//! This module provides the `Amount` type which wraps `Decimal`. The service sends and receives
//! amounts as JSON numbers, while people type them with or without a dollar sign and commas.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Represents a dollar amount.
///
/// Amounts are displayed with a dollar sign, commas and two decimal places, e.g. `$1,234.50`.
///
/// # Examples
///
/// ```
/// # use finmate::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("$1,000.5").unwrap();
/// assert_eq!(amount.to_string(), "$1,000.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates a new Amount from a Decimal value.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Formats the amount as an expense, e.g. `-$12.50`.
    pub fn as_expense(&self) -> String {
        format!("-{self}")
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let digits = unsigned.strip_prefix('$').unwrap_or(unsigned).replace(',', "");
        let value = Decimal::from_str(&digits).map_err(AmountError)?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0.is_sign_negative() && !self.is_zero() {
            "-"
        } else {
            ""
        };
        let num = self.0.abs().round_dp(2).to_f64().unwrap_or_default();
        write!(f, "{sign}${}", format_num::format_num!(",.2", num))
    }
}

/// Saturates at `Decimal::MAX` (or `MIN`) instead of overflowing.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // The service stores amounts as BigDecimal but speaks JSON numbers.
        match self.0.to_f64() {
            Some(n) => serializer.serialize_f64(n),
            None => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Accepts a JSON number or a string such as `"$12.50"`.
struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a string holding a dollar amount")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        // Going through the shortest round-trip representation keeps 12.1 from becoming
        // 12.0999999999999996447286321199499070644378662109375.
        Amount::from_str(&v.to_string()).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("50.00").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
    }

    #[test]
    fn test_parse_with_dollar_sign_and_commas() {
        let amount = Amount::from_str("  $1,234,567.89 ").unwrap();
        assert_eq!(amount.value(), dec("1234567.89"));
    }

    #[test]
    fn test_parse_negative_with_dollar_sign() {
        let amount = Amount::from_str("-$50.00").unwrap();
        assert_eq!(amount.value(), dec("-50.00"));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(Amount::from_str("twelve").is_err());
        assert!(Amount::from_str("").is_err());
    }

    #[test]
    fn test_display_always_has_two_places() {
        assert_eq!(Amount::new(dec("50")).to_string(), "$50.00");
        assert_eq!(Amount::new(dec("1000.5")).to_string(), "$1,000.50");
        assert_eq!(Amount::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_as_expense() {
        assert_eq!(Amount::new(dec("12.5")).as_expense(), "-$12.50");
    }

    #[test]
    fn test_is_positive() {
        assert!(Amount::new(dec("0.01")).is_positive());
        assert!(!Amount::ZERO.is_positive());
        assert!(!Amount::new(dec("-3")).is_positive());
    }

    #[test]
    fn test_sum() {
        let amounts = [Amount::new(dec("0.10")), Amount::new(dec("0.20"))];
        let total: Amount = amounts.iter().sum();
        assert_eq!(total.value(), dec("0.30"));
    }

    #[test]
    fn test_sum_saturates() {
        let huge = Amount::from_str("50000000000000000000000000000").unwrap();
        let total: Amount = [huge, huge, Amount::new(dec("1"))].iter().sum();
        assert_eq!(total.value(), Decimal::MAX);

        let mut running = huge;
        running += huge;
        assert_eq!(running.value(), Decimal::MAX);
    }

    #[test]
    fn test_deserialize_number() {
        let amount: Amount = serde_json::from_str("12.1").unwrap();
        assert_eq!(amount.value(), dec("12.1"));
        let amount: Amount = serde_json::from_str("40").unwrap();
        assert_eq!(amount.value(), dec("40"));
    }

    #[test]
    fn test_deserialize_string() {
        let amount: Amount = serde_json::from_str("\"$7.25\"").unwrap();
        assert_eq!(amount.value(), dec("7.25"));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&Amount::new(dec("87.43"))).unwrap();
        assert_eq!(json, "87.43");
    }
}
