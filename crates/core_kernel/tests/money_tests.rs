//! Unit tests for the money module
//!
//! Charge amounts must survive the trip from rating engine to settlement
//! record without any rounding, so most of these pin down exactness and scale.

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod currency {
    use super::*;

    #[test]
    fn test_constants_match_parsed_codes() {
        assert_eq!(Currency::new("EUR").unwrap(), Currency::EUR);
        assert_eq!(Currency::new("usd").unwrap(), Currency::USD);
        assert_eq!(Currency::new(" gbp ").unwrap(), Currency::GBP);
    }

    #[test]
    fn test_any_well_formed_code_is_accepted() {
        let brl: Currency = "BRL".parse().unwrap();
        assert_eq!(brl.code(), "BRL");
    }

    #[test]
    fn test_invalid_codes() {
        for code in ["", "E", "EURO", "12A", "€UR"] {
            assert!(
                matches!(Currency::new(code), Err(MoneyError::InvalidCurrency(_))),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_roundtrip_as_plain_string() {
        let json = serde_json::to_string(&Currency::EUR).unwrap();
        assert_eq!(json, "\"EUR\"");

        let parsed: Currency = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(parsed, Currency::EUR);

        let invalid: Result<Currency, _> = serde_json::from_str("\"EURO\"");
        assert!(invalid.is_err());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_new_keeps_given_scale() {
        let m = Money::new(dec!(1.23456), Currency::EUR);
        assert_eq!(m.amount().to_string(), "1.23456");
    }

    #[test]
    fn test_tax_portion_is_exact() {
        let cost = Money::new(dec!(0.30), Currency::EUR);
        let duty_free = Money::new(dec!(0.10), Currency::EUR);
        let tax = cost.checked_sub(&duty_free).unwrap();
        assert_eq!(tax.amount(), dec!(0.20));
        assert_eq!(tax.to_string(), "0.20 EUR");
    }

    #[test]
    fn test_negative_detection() {
        let m = Money::new(dec!(-0.01), Currency::EUR);
        assert!(m.is_negative());
        assert!(!Money::zero(Currency::EUR).is_negative());
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Money::new(Decimal::MAX, Currency::EUR);
        let one = Money::new(dec!(1), Currency::EUR);
        assert_eq!(max.checked_add(&one), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_currency_mismatch_on_add() {
        let eur = Money::new(dec!(10), Currency::EUR);
        let gbp = Money::new(dec!(10), Currency::GBP);
        assert_eq!(
            eur.checked_add(&gbp),
            Err(MoneyError::CurrencyMismatch("EUR".to_string(), "GBP".to_string()))
        );
    }
}
