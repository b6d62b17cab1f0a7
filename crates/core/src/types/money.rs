//! Type-safe monetary amounts using decimal arithmetic.
//!
//! Cart and order totals are computed with `rust_decimal` rather than
//! floating point so that repeated addition never drifts.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when working with [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is negative where a non-negative amount is required.
    #[error("amount cannot be negative")]
    Negative,
    /// Amount does not fit in the smallest currency unit.
    #[error("amount cannot be represented in minor units")]
    MinorUnitOverflow,
}

/// A monetary amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new monetary amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }

    /// Create an amount from minor units (e.g., cents for USD).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, 2),
            currency_code,
        }
    }

    /// Convert to minor units (e.g., cents for USD).
    ///
    /// This is the representation hosted-payment providers expect for
    /// line-item amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for negative amounts and
    /// [`MoneyError::MinorUnitOverflow`] if the scaled value does not fit
    /// in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        if self.amount.is_sign_negative() {
            return Err(MoneyError::Negative);
        }
        let scaled = (self.amount * Decimal::new(100, 0)).round();
        scaled.to_i64().ok_or(MoneyError::MinorUnitOverflow)
    }

    /// Multiply by a quantity (for line totals).
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self {
            amount: self.amount * Decimal::from(quantity),
            currency_code: self.currency_code,
        }
    }

    /// Add another amount in the same currency.
    ///
    /// Returns `None` if the currencies differ.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        if self.currency_code != other.currency_code {
            return None;
        }
        Some(Self {
            amount: self.amount + other.amount,
            currency_code: self.currency_code,
        })
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
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
}

impl CurrencyCode {
    /// Currency symbol for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Lowercase code as the payment provider expects it.
    #[must_use]
    pub const fn as_provider_code(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Money {
        Money::new(s.parse().unwrap(), CurrencyCode::USD)
    }

    #[test]
    fn test_minor_units_roundtrip() {
        let price = Money::from_minor_units(1999, CurrencyCode::USD);
        assert_eq!(price.to_minor_units().unwrap(), 1999);
        assert_eq!(price.display(), "$19.99");
    }

    #[test]
    fn test_minor_units_rejects_negative() {
        let price = usd("-1.00");
        assert_eq!(price.to_minor_units(), Err(MoneyError::Negative));
    }

    #[test]
    fn test_times_is_exact() {
        // 0.10 * 3 must be exactly 0.30, not 0.30000000000000004
        let line = usd("0.10").times(3);
        assert_eq!(line, usd("0.30"));
    }

    #[test]
    fn test_checked_add_same_currency() {
        let total = usd("19.99").checked_add(&usd("0.01")).unwrap();
        assert_eq!(total, usd("20.00"));
    }

    #[test]
    fn test_checked_add_currency_mismatch() {
        let a = usd("1.00");
        let b = Money::new(Decimal::ONE, CurrencyCode::EUR);
        assert!(a.checked_add(&b).is_none());
    }

    #[test]
    fn test_zero() {
        assert_eq!(Money::zero(CurrencyCode::USD).to_minor_units().unwrap(), 0);
    }

    #[test]
    fn test_provider_code() {
        assert_eq!(CurrencyCode::USD.as_provider_code(), "usd");
        assert_eq!(CurrencyCode::GBP.as_provider_code(), "gbp");
    }
}
