//! Currency-aware amounts with exact decimal arithmetic
//!
//! Charge amounts arrive from the rating engine as decimal strings and leave
//! towards the settlement system as decimal strings. Nothing in between is
//! allowed to touch floating point, so every amount is a `rust_decimal::Decimal`
//! tagged with the ISO 4217 code of the pricing model's general currency.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// ISO 4217 currency code
///
/// Stored as three upper-case ASCII letters so the type stays `Copy`.
/// Any well-formed code is accepted; the pricing model decides which
/// currencies are actually in use.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub const EUR: Currency = Currency(*b"EUR");
    pub const USD: Currency = Currency(*b"USD");
    pub const GBP: Currency = Currency(*b"GBP");

    /// Parses a currency code, accepting lower-case input
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidCurrency` unless the input is exactly
    /// three ASCII letters.
    pub fn new(code: &str) -> Result<Self, MoneyError> {
        let bytes = code.trim().as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(MoneyError::InvalidCurrency(code.to_string()));
        }

        let mut upper = [0u8; 3];
        for (slot, byte) in upper.iter_mut().zip(bytes) {
            *slot = byte.to_ascii_uppercase();
        }
        Ok(Self(upper))
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &str {
        // Construction guarantees ASCII letters only
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> String {
        currency.code().to_string()
    }
}

/// A monetary amount with associated currency
///
/// Unlike ledger balances, charge amounts are carried at the scale they were
/// priced with: `50.00` stays `50.00` so descriptions and settlement records
/// show exactly what the rating engine produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly below zero
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Checked addition that fails on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction that fails on currency mismatch or overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

/// Renders as `"{amount} {code}"`, the form used in CDR descriptions
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_parsing_normalizes_case() {
        let currency = Currency::new("eur").unwrap();
        assert_eq!(currency, Currency::EUR);
        assert_eq!(currency.code(), "EUR");
    }

    #[test]
    fn test_currency_rejects_malformed_codes() {
        assert!(Currency::new("EU").is_err());
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("E1R").is_err());
    }

    #[test]
    fn test_money_display_keeps_scale() {
        let m = Money::new(dec!(50.00), Currency::EUR);
        assert_eq!(m.to_string(), "50.00 EUR");
    }

    #[test]
    fn test_checked_sub_is_exact() {
        let cost = Money::new(dec!(100.00), Currency::EUR);
        let duty_free = Money::new(dec!(80.00), Currency::EUR);
        assert_eq!(cost.checked_sub(&duty_free).unwrap().amount(), dec!(20.00));
    }

    #[test]
    fn test_currency_mismatch() {
        let eur = Money::new(dec!(1), Currency::EUR);
        let usd = Money::new(dec!(1), Currency::USD);
        assert!(matches!(
            eur.checked_sub(&usd),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn subtraction_then_addition_restores_cost(
            cost in 0i64..1_000_000_000i64,
            duty_free in 0i64..1_000_000_000i64,
        ) {
            let cost = Money::new(Decimal::new(cost, 2), Currency::EUR);
            let duty_free = Money::new(Decimal::new(duty_free, 2), Currency::EUR);

            let tax = cost.checked_sub(&duty_free).unwrap();
            prop_assert_eq!(tax.checked_add(&duty_free).unwrap().amount(), cost.amount());
        }
    }
}
