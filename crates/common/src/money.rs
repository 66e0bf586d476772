use serde::{Deserialize, Serialize};

use crate::CommonError;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a non-negative Money amount, as required for a saga's
    /// `totalAmount` field. Rejects negative inputs instead of clamping.
    pub fn from_cents_non_negative(cents: i64) -> Result<Self, CommonError> {
        if cents < 0 {
            return Err(CommonError::NegativeAmount(cents));
        }
        Ok(Self { cents })
    }

    /// Parses a non-negative decimal dollar string (`"99.99"`) into cents,
    /// the shape `totalAmount` arrives in on the wire.
    pub fn from_decimal_str(s: &str) -> Result<Self, CommonError> {
        if s.starts_with('-') {
            return Err(CommonError::InvalidAmount(s.to_string()));
        }
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let whole: i64 = whole
            .parse()
            .map_err(|_| CommonError::InvalidAmount(s.to_string()))?;
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(CommonError::InvalidAmount(s.to_string()));
        }
        let frac_str = format!("{:0<2}", frac);
        let frac_cents: i64 = frac_str
            .parse()
            .map_err(|_| CommonError::InvalidAmount(s.to_string()))?;
        Self::from_cents_non_negative(whole * 100 + frac_cents)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is non-negative.
    pub fn is_non_negative(&self) -> bool {
        self.cents >= 0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

/// 3-letter ISO-4217-shaped currency code, validated but not looked up
/// against a registry (an unknown-but-well-formed code is accepted — that
/// validation belongs to the services that actually move money).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Result<Self, CommonError> {
        let code = code.into();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CommonError::InvalidCurrency(code));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cents_non_negative_rejects_negative() {
        assert!(Money::from_cents_non_negative(-1).is_err());
        assert!(Money::from_cents_non_negative(0).is_ok());
    }

    #[test]
    fn from_decimal_str_parses_dollars_and_cents() {
        let m = Money::from_decimal_str("99.99").unwrap();
        assert_eq!(m.cents(), 9999);
    }

    #[test]
    fn from_decimal_str_parses_whole_dollars() {
        let m = Money::from_decimal_str("10").unwrap();
        assert_eq!(m.cents(), 1000);
    }

    #[test]
    fn from_decimal_str_rejects_sub_cent_precision() {
        assert!(Money::from_decimal_str("10.999").is_err());
    }

    #[test]
    fn display_formats_as_fixed_point() {
        let m = Money::from_cents(9999);
        assert_eq!(m.to_string(), "99.99");
    }

    #[test]
    fn currency_rejects_wrong_length() {
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("USDD").is_err());
    }

    #[test]
    fn currency_normalizes_case() {
        let c = Currency::new("usd").unwrap();
        assert_eq!(c.as_str(), "USD");
    }
}
