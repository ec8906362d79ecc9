//! Pricing-model adapter
//!
//! Flattens an [`AppliedCharge`] into the ordered list of [`PricedPart`]s the
//! formatter turns into CDRs: single payments first, then subscriptions, then
//! usage, each category in input order. Refunds skip the decomposition and
//! become a single aggregated part.

use rust_decimal::Decimal;

use core_kernel::{Currency, Money};

use crate::applied::{AppliedCharge, OneTimePart, RecurringPart, UsagePart};
use crate::error::AdapterError;

/// Event label of one-time charge records
pub const ONE_TIME_PAYMENT_EVENT: &str = "One time payment event";
/// Event label of recurring charge records
pub const RECURRING_PAYMENT_EVENT: &str = "Recurring payment event";
/// Event label of usage charge records
pub const PAY_PER_USE_EVENT: &str = "Pay per use event";
/// Event label of refund records
pub const REFUND_EVENT: &str = "Refund event";

/// A priced line item waiting for a correlation number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedPart {
    pub cost: Money,
    pub duty_free: Money,
    pub event: &'static str,
    pub description: String,
}

impl PricedPart {
    /// Builds a part after checking that its tax portion is not negative
    fn checked(
        event: &'static str,
        cost: Money,
        duty_free: Money,
        description: String,
    ) -> Result<Self, AdapterError> {
        if duty_free.amount() > cost.amount() {
            return Err(AdapterError::DutyFreeExceedsCost {
                event: event.to_string(),
                cost: cost.amount(),
                duty_free: duty_free.amount(),
            });
        }

        Ok(Self {
            cost,
            duty_free,
            event,
            description,
        })
    }

    /// Taxed portion of the cost: cost minus duty-free, exact
    pub fn tax(&self) -> Result<Money, AdapterError> {
        self.cost
            .checked_sub(&self.duty_free)
            .map_err(|source| AdapterError::Calculation {
                event: self.event.to_string(),
                source,
            })
    }
}

/// Decomposes applied charges priced in one currency
#[derive(Debug, Clone, Copy)]
pub struct PricingModelAdapter {
    currency: Currency,
}

impl PricingModelAdapter {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }

    /// Produces one part per entry of every present category
    ///
    /// # Errors
    ///
    /// The whole charge is rejected if any entry has a duty-free amount above
    /// its cost or a usage entry's consumption sums below zero. Nothing is
    /// returned for the valid entries in that case.
    pub fn decompose(&self, applied: &AppliedCharge) -> Result<Vec<PricedPart>, AdapterError> {
        let mut parts = Vec::with_capacity(applied.part_count());

        for part in applied.single_payment.iter().flatten() {
            parts.push(self.one_time(part)?);
        }
        for part in applied.subscription.iter().flatten() {
            parts.push(self.recurring(part)?);
        }
        for part in applied.accounting.iter().flatten() {
            parts.push(self.usage(part)?);
        }

        Ok(parts)
    }

    /// Single part standing for the whole refunded payment
    pub fn refund(&self, price: Decimal, duty_free: Decimal) -> Result<PricedPart, AdapterError> {
        let cost = self.money(price);
        PricedPart::checked(
            REFUND_EVENT,
            cost,
            self.money(duty_free),
            format!("Refund event: {}", cost),
        )
    }

    fn one_time(&self, part: &OneTimePart) -> Result<PricedPart, AdapterError> {
        let cost = self.money(part.value);
        PricedPart::checked(
            ONE_TIME_PAYMENT_EVENT,
            cost,
            self.money(part.duty_free),
            format!("One time payment: {}", cost),
        )
    }

    fn recurring(&self, part: &RecurringPart) -> Result<PricedPart, AdapterError> {
        let cost = self.money(part.value);
        PricedPart::checked(
            RECURRING_PAYMENT_EVENT,
            cost,
            self.money(part.duty_free),
            format!("Recurring payment: {} {}", cost, part.unit),
        )
    }

    fn usage(&self, part: &UsagePart) -> Result<PricedPart, AdapterError> {
        let total = part
            .total_consumption()
            .ok_or_else(|| AdapterError::Calculation {
                event: PAY_PER_USE_EVENT.to_string(),
                source: core_kernel::MoneyError::Overflow,
            })?;

        if total.is_sign_negative() && !total.is_zero() {
            return Err(AdapterError::NegativeConsumption {
                unit: part.model.unit.clone(),
                total,
            });
        }

        PricedPart::checked(
            PAY_PER_USE_EVENT,
            self.money(part.price),
            self.money(part.duty_free),
            format!("Fee per {}, Consumption: {}", part.model.unit, total.normalize()),
        )
    }

    fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn adapter() -> PricingModelAdapter {
        PricingModelAdapter::new(Currency::EUR)
    }

    #[test]
    fn test_category_order_is_fixed() {
        let applied = AppliedCharge::new()
            .with_accounting(vec![UsagePart::new(dec!(1), dec!(1), "call").with_usage([dec!(1)])])
            .with_subscription(vec![RecurringPart::new(dec!(10), dec!(8), "monthly")])
            .with_single_payment(vec![OneTimePart::new(dec!(5), dec!(4))]);

        let events: Vec<_> = adapter()
            .decompose(&applied)
            .unwrap()
            .into_iter()
            .map(|p| p.event)
            .collect();

        assert_eq!(
            events,
            vec![ONE_TIME_PAYMENT_EVENT, RECURRING_PAYMENT_EVENT, PAY_PER_USE_EVENT]
        );
    }

    #[test]
    fn test_descriptions() {
        let applied = AppliedCharge::new()
            .with_single_payment(vec![OneTimePart::new(dec!(12.00), dec!(10.00))])
            .with_subscription(vec![RecurringPart::new(dec!(9.99), dec!(8.26), "monthly")]);

        let parts = adapter().decompose(&applied).unwrap();
        assert_eq!(parts[0].description, "One time payment: 12.00 EUR");
        assert_eq!(parts[1].description, "Recurring payment: 9.99 EUR monthly");
    }

    #[test]
    fn test_usage_aggregates_across_records() {
        let applied = AppliedCharge::new().with_accounting(vec![
            UsagePart::new(dec!(6.00), dec!(5.00), "call").with_usage([dec!(3), dec!(4), dec!(5)]),
        ]);

        let parts = adapter().decompose(&applied).unwrap();
        assert_eq!(parts[0].description, "Fee per call, Consumption: 12");
        assert_eq!(parts[0].cost.amount(), dec!(6.00));
    }

    #[test]
    fn test_usage_without_records_reports_zero() {
        let applied = AppliedCharge::new()
            .with_subscription(vec![RecurringPart::new(dec!(10), dec!(8), "monthly")])
            .with_accounting(vec![UsagePart::new(dec!(0), dec!(0), "megabyte")]);

        let parts = adapter().decompose(&applied).unwrap();
        assert_eq!(parts[1].description, "Fee per megabyte, Consumption: 0");
    }

    #[test]
    fn test_negative_consumption_rejected() {
        let applied = AppliedCharge::new().with_accounting(vec![
            UsagePart::new(dec!(1), dec!(1), "call").with_usage([dec!(2), dec!(-5)]),
        ]);

        assert!(matches!(
            adapter().decompose(&applied),
            Err(AdapterError::NegativeConsumption { .. })
        ));
    }

    #[test]
    fn test_duty_free_above_cost_rejected() {
        let applied = AppliedCharge::new()
            .with_single_payment(vec![OneTimePart::new(dec!(10), dec!(10.01))]);

        assert!(matches!(
            adapter().decompose(&applied),
            Err(AdapterError::DutyFreeExceedsCost { .. })
        ));
    }

    #[test]
    fn test_refund_part() {
        let part = adapter().refund(dec!(50.00), dec!(40.00)).unwrap();
        assert_eq!(part.event, REFUND_EVENT);
        assert_eq!(part.description, "Refund event: 50.00 EUR");
        assert_eq!(part.tax().unwrap().amount(), dec!(10.00));
    }
}
