//! Amount value object.
//!
//! Monetary values travel as decimal strings with up to two fraction digits
//! (`"10"`, `"10.5"`, `"10.50"`) and are always rendered with exactly two
//! (`"10.50"`). Arithmetic is exact; there is no floating point anywhere.
//! Addition is checked: a total that cannot be represented is an error, not
//! a panic.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Largest number of whole-unit digits accepted on input. Keeps every parsed
/// amount convertible to `i64` minor units.
pub const MAX_WHOLE_DIGITS: usize = 15;

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(\.\d{1,2})?$").expect("amount pattern is a valid regex")
});

/// Non-negative monetary amount with two-digit minor unit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero.
    pub fn zero() -> Self {
        Self(Decimal::new(0, 2))
    }

    /// Parses a decimal string, rejecting anything but `^\d+(\.\d{1,2})?$`
    /// or a whole part longer than [`MAX_WHOLE_DIGITS`].
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("amount"));
        }
        if !AMOUNT_PATTERN.is_match(trimmed) {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("'{}' is not a decimal with at most two fraction digits", raw),
            ));
        }
        let whole_digits = trimmed.split('.').next().unwrap_or_default().len();
        if whole_digits > MAX_WHOLE_DIGITS {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("'{}' has more than {} whole digits", raw, MAX_WHOLE_DIGITS),
            ));
        }
        let mut value = Decimal::from_str(trimmed)
            .map_err(|e| ValidationError::invalid_format("amount", e.to_string()))?;
        value.rescale(2);
        Ok(Self(value))
    }

    /// Builds an amount from minor units (pence / cents).
    pub fn from_minor_units(minor: i64) -> Result<Self, ValidationError> {
        if minor < 0 {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("negative minor units: {}", minor),
            ));
        }
        Ok(Self(Decimal::new(minor, 2)))
    }

    /// Converts to minor units (pence / cents).
    ///
    /// Fails when the value does not fit an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, ValidationError> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.trunc().to_i64())
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "amount",
                    format!("{} is too large to express in minor units", self),
                )
            })
    }

    /// Adds, returning `None` on overflow.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        let mut sum = self.0.checked_add(rhs.0)?;
        sum.rescale(2);
        Some(Amount(sum))
    }

    /// Sums every amount, returning `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Amount>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts
            .into_iter()
            .try_fold(Amount::zero(), |acc, a| acc.checked_add(a))
    }

    /// Sums every amount, capping at the largest representable value.
    pub fn saturating_sum<I>(amounts: I) -> Amount
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts.into_iter().fold(Amount::zero(), |acc, a| {
            acc.checked_add(a).unwrap_or(Amount(Decimal::MAX))
        })
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts, flooring at zero.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        if other.0 >= self.0 {
            Amount::zero()
        } else {
            let mut diff = self.0 - other.0;
            diff.rescale(2);
            Amount(diff)
        }
    }

    /// Returns the inner decimal.
    pub fn as_decimal(&self) -> &Decimal {
        &self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Amount::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_whole_and_fractional_values() {
        assert_eq!(Amount::parse("10").unwrap().to_string(), "10.00");
        assert_eq!(Amount::parse("10.5").unwrap().to_string(), "10.50");
        assert_eq!(Amount::parse("0.01").unwrap().to_string(), "0.01");
    }

    #[test]
    fn rejects_malformed_values() {
        for raw in ["", "-1", "1.234", "1.", ".5", "1,00", "ten", "1e3", "£5"] {
            assert!(Amount::parse(raw).is_err(), "{} should be rejected", raw);
        }
    }

    #[test]
    fn sums_exactly() {
        let items = vec![Amount::parse("10.00").unwrap(), Amount::parse("20.00").unwrap()];
        let total = Amount::checked_sum(items).unwrap();
        assert_eq!(total.to_string(), "30.00");

        let tenths =
            Amount::checked_sum(std::iter::repeat(Amount::parse("0.10").unwrap()).take(3)).unwrap();
        assert_eq!(tenths, Amount::parse("0.3").unwrap());
        assert_eq!(Amount::checked_sum(Vec::new()), Some(Amount::zero()));
    }

    #[test]
    fn rejects_more_whole_digits_than_supported() {
        let widest = "9".repeat(MAX_WHOLE_DIGITS);
        assert!(Amount::parse(&format!("{}.99", widest)).is_ok());

        let too_wide = "9".repeat(MAX_WHOLE_DIGITS + 1);
        assert!(Amount::parse(&too_wide).is_err());
        assert!(Amount::parse("50000000000000000000000000000").is_err());
        assert!(Amount::parse("92233720368547758.08").is_err());
    }

    #[test]
    fn addition_past_decimal_range_is_none() {
        let huge = Amount(Decimal::MAX);
        let one = Amount::parse("1").unwrap();
        assert_eq!(huge.checked_add(one), None);
        assert_eq!(Amount::checked_sum(vec![one, huge, one]), None);
    }

    #[test]
    fn saturating_sum_caps_instead_of_panicking() {
        let huge = Amount(Decimal::MAX);
        let one = Amount::parse("1").unwrap();
        assert_eq!(Amount::saturating_sum(vec![huge, one]), huge);
        assert_eq!(Amount::saturating_sum(vec![one, one]).to_string(), "2.00");
    }

    #[test]
    fn minor_units_convert_both_ways() {
        let amount = Amount::parse("12.34").unwrap();
        assert_eq!(amount.to_minor_units().unwrap(), 1234);
        assert_eq!(Amount::from_minor_units(1234).unwrap(), amount);
        assert!(Amount::from_minor_units(-1).is_err());
    }

    #[test]
    fn largest_parsed_amount_fits_minor_units() {
        let widest = Amount::parse(&format!("{}.99", "9".repeat(MAX_WHOLE_DIGITS))).unwrap();
        assert_eq!(widest.to_minor_units().unwrap(), 99_999_999_999_999_999);
    }

    #[test]
    fn minor_unit_overflow_is_an_error() {
        let beyond_i64 = Amount::from_minor_units(i64::MAX)
            .unwrap()
            .checked_add(Amount::parse("0.01").unwrap())
            .unwrap();
        assert_eq!(beyond_i64.to_string(), "92233720368547758.08");
        assert!(beyond_i64.to_minor_units().is_err());
        assert!(Amount(Decimal::MAX).to_minor_units().is_err());
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let four = Amount::parse("4").unwrap();
        let eight = Amount::parse("8").unwrap();
        assert!(four.saturating_sub(eight).is_zero());
        assert_eq!(eight.saturating_sub(four), four);
    }

    #[test]
    fn serializes_as_two_digit_string() {
        let json = serde_json::to_string(&Amount::parse("7.5").unwrap()).unwrap();
        assert_eq!(json, "\"7.50\"");
        let back: Amount = serde_json::from_str("\"7.50\"").unwrap();
        assert_eq!(back.to_string(), "7.50");
        assert!(serde_json::from_str::<Amount>("\"7.505\"").is_err());
    }

    proptest! {
        #[test]
        fn sum_matches_minor_unit_sum(values in proptest::collection::vec(0i64..10_000_000, 0..20)) {
            let amounts: Vec<Amount> = values
                .iter()
                .map(|v| Amount::from_minor_units(*v).unwrap())
                .collect();
            let total = Amount::checked_sum(amounts).unwrap();
            prop_assert_eq!(total.to_minor_units().unwrap(), values.iter().sum::<i64>());
        }

        #[test]
        fn rendering_reparses_to_same_value(pence in 0i64..1_000_000_000) {
            let amount = Amount::from_minor_units(pence).unwrap();
            let reparsed = Amount::parse(&amount.to_string()).unwrap();
            prop_assert_eq!(reparsed, amount);
        }
    }
}
