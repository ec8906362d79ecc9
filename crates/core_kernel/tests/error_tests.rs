//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::{Currency, MoneyError};

#[test]
fn test_core_error_from_money_error() {
    let money_error = Currency::new("EURO").unwrap_err();
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(MoneyError::InvalidCurrency(_))));
}

#[test]
fn test_core_error_configuration_display() {
    let error = CoreError::configuration("settlement base_url is empty");
    let display = format!("{}", error);

    assert!(display.contains("Configuration error"));
    assert!(display.contains("base_url"));
}
