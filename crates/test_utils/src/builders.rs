//! Test Data Builders
//!
//! Builder for applied charges so tests state only the components they care
//! about.

use rust_decimal::Decimal;

use domain_charging::{AppliedCharge, OneTimePart, RecurringPart, UsagePart};

/// Builder for constructing applied charges
///
/// Categories stay absent until a component of that kind is added.
#[derive(Debug, Default)]
pub struct AppliedChargeBuilder {
    single_payment: Option<Vec<OneTimePart>>,
    subscription: Option<Vec<RecurringPart>>,
    accounting: Option<Vec<UsagePart>>,
}

impl AppliedChargeBuilder {
    /// Creates a new builder with no components
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a one-time component
    pub fn one_time(mut self, value: Decimal, duty_free: Decimal) -> Self {
        self.single_payment
            .get_or_insert_with(Vec::new)
            .push(OneTimePart::new(value, duty_free));
        self
    }

    /// Adds a recurring component
    pub fn recurring(mut self, value: Decimal, duty_free: Decimal, unit: &str) -> Self {
        self.subscription
            .get_or_insert_with(Vec::new)
            .push(RecurringPart::new(value, duty_free, unit));
        self
    }

    /// Adds a usage component with one usage record per value
    pub fn usage(
        mut self,
        price: Decimal,
        duty_free: Decimal,
        unit: &str,
        usage: impl IntoIterator<Item = Decimal>,
    ) -> Self {
        self.accounting
            .get_or_insert_with(Vec::new)
            .push(UsagePart::new(price, duty_free, unit).with_usage(usage));
        self
    }

    /// Marks the subscription category present but empty
    pub fn empty_subscription(mut self) -> Self {
        self.subscription.get_or_insert_with(Vec::new);
        self
    }

    /// Builds the applied charge
    pub fn build(self) -> AppliedCharge {
        AppliedCharge {
            single_payment: self.single_payment,
            subscription: self.subscription,
            accounting: self.accounting,
        }
    }
}
