//! Type-safe price representation using decimal arithmetic.
//!
//! Prices and order totals are `Decimal` throughout the system; the only
//! place an amount leaves decimal space is the payment-API boundary, which
//! wants integer minor units (cents). [`Price::minor_units`] does that
//! conversion exactly and refuses amounts that cannot be represented.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors converting a [`Price`] to payment-API minor units.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PriceError {
    /// The amount is negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount does not fit in an i64 once scaled to minor units.
    #[error("price out of range: {0}")]
    OutOfRange(Decimal),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// The amount in integer minor units (e.g., cents), rounded half-even to
    /// the currency's exponent.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::OutOfRange` for amounts that overflow an `i64`.
    pub fn minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }
        let scaled = (self.amount * Decimal::from(100)).round();
        scaled.to_i64().ok_or(PriceError::OutOfRange(self.amount))
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    INR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
            Self::INR => "\u{20b9}",
        }
    }

    /// Lowercase ISO code as payment APIs expect it (e.g., "usd").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
            Self::INR => "inr",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            "inr" => Ok(Self::INR),
            _ => Err(format!("unsupported currency code: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_minor_units_exact() {
        let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(price.minor_units().unwrap(), 1999);
    }

    #[test]
    fn test_minor_units_rounds_sub_cent() {
        // 10.005 rounds half-even to 10.00
        let price = Price::new(Decimal::new(10_005, 3), CurrencyCode::USD);
        assert_eq!(price.minor_units().unwrap(), 1000);
    }

    #[test]
    fn test_minor_units_rejects_negative() {
        let price = Price::new(Decimal::new(-1, 0), CurrencyCode::USD);
        assert!(matches!(price.minor_units(), Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_display() {
        let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(price.display(), "$19.99");
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert!("xyz".parse::<CurrencyCode>().is_err());
    }
}
