//! Rupee prices using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative price in Indian rupees.
///
/// Deserializes from a JSON number or string; the backend's `numeric` column
/// accepts either on write.
/// Displayed with the rupee sign and Indian digit grouping:
///
/// ```
/// use siddha_clinic_core::Price;
///
/// assert_eq!(Price::parse("1250").unwrap().to_string(), "₹1,250");
/// assert_eq!(Price::parse("125000").unwrap().to_string(), "₹1,25,000");
/// assert_eq!(Price::parse("99.5").unwrap().to_string(), "₹99.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Parse a price from form input such as `"450"` or `"99.50"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] when the text is not a non-negative number.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// True when the price is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        let whole = rounded.trunc().to_string();
        let fraction = (rounded - rounded.trunc()).abs();

        write!(f, "₹{}", group_indian(&whole))?;
        if !fraction.is_zero() {
            let cents = (fraction * Decimal::ONE_HUNDRED).round().to_string();
            write!(f, ".{cents:0>2}")?;
        }
        Ok(())
    }
}

/// Insert separators using the Indian system: the last three digits, then
/// groups of two (`12,34,567`).
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_owned();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}
