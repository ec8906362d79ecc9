//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating applied charges that satisfy
//! the adapter's invariants (duty-free never above cost, non-negative usage).

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_charging::{AppliedCharge, OneTimePart, RecurringPart, UsagePart};

/// Strategy for non-negative amounts with two decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Strategy for `(cost, duty_free)` pairs with `duty_free <= cost`
pub fn priced_pair_strategy() -> impl Strategy<Value = (Decimal, Decimal)> {
    (0i64..10_000_000i64)
        .prop_flat_map(|cost| (Just(cost), 0i64..=cost))
        .prop_map(|(cost, duty_free)| (Decimal::new(cost, 2), Decimal::new(duty_free, 2)))
}

/// Strategy for period labels of recurring components
pub fn unit_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("monthly".to_string()),
        Just("weekly".to_string()),
        Just("yearly".to_string()),
    ]
}

/// Strategy for usage component quantities
pub fn usage_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec((0i64..1_000i64).prop_map(Decimal::from), 0..5)
}

/// Strategy for valid applied charges with up to `max_per_category`
/// components in each category; a category may also be absent
pub fn applied_charge_strategy(max_per_category: usize) -> impl Strategy<Value = AppliedCharge> {
    let single = prop::option::of(prop::collection::vec(
        priced_pair_strategy().prop_map(|(value, duty_free)| OneTimePart::new(value, duty_free)),
        0..=max_per_category,
    ));
    let subscription = prop::option::of(prop::collection::vec(
        (priced_pair_strategy(), unit_strategy())
            .prop_map(|((value, duty_free), unit)| RecurringPart::new(value, duty_free, unit)),
        0..=max_per_category,
    ));
    let accounting = prop::option::of(prop::collection::vec(
        (priced_pair_strategy(), usage_strategy()).prop_map(|((price, duty_free), usage)| {
            UsagePart::new(price, duty_free, "call").with_usage(usage)
        }),
        0..=max_per_category,
    ));

    (single, subscription, accounting).prop_map(|(single_payment, subscription, accounting)| {
        AppliedCharge {
            single_payment,
            subscription,
            accounting,
        }
    })
}
