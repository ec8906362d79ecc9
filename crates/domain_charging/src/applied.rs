//! Applied charge model
//!
//! Shape of the priced components the rating engine hands over once a charge
//! has been computed. Each category is optional and each entry keeps the
//! position the rating engine gave it, which later fixes the order in which
//! correlation numbers are assigned.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Priced components of one charge
///
/// ```rust,ignore
/// let applied: AppliedCharge = serde_json::from_str(r#"{
///     "subscription": [
///         { "value": "10.00", "duty_free": "8.26", "unit": "monthly" }
///     ]
/// }"#)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedCharge {
    /// One-time charges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_payment: Option<Vec<OneTimePart>>,
    /// Recurring charges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Vec<RecurringPart>>,
    /// Usage-based charges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounting: Option<Vec<UsagePart>>,
}

impl AppliedCharge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_single_payment(mut self, parts: Vec<OneTimePart>) -> Self {
        self.single_payment = Some(parts);
        self
    }

    pub fn with_subscription(mut self, parts: Vec<RecurringPart>) -> Self {
        self.subscription = Some(parts);
        self
    }

    pub fn with_accounting(mut self, parts: Vec<UsagePart>) -> Self {
        self.accounting = Some(parts);
        self
    }

    /// Number of CDRs this charge will produce
    pub fn part_count(&self) -> usize {
        self.single_payment.as_ref().map_or(0, Vec::len)
            + self.subscription.as_ref().map_or(0, Vec::len)
            + self.accounting.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.part_count() == 0
    }
}

/// A one-time price component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimePart {
    pub value: Decimal,
    pub duty_free: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl OneTimePart {
    pub fn new(value: Decimal, duty_free: Decimal) -> Self {
        Self {
            value,
            duty_free,
            unit: None,
        }
    }
}

/// A recurring price component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPart {
    pub value: Decimal,
    pub duty_free: Decimal,
    /// Billing period label, e.g. "monthly"
    pub unit: String,
}

impl RecurringPart {
    pub fn new(value: Decimal, duty_free: Decimal, unit: impl Into<String>) -> Self {
        Self {
            value,
            duty_free,
            unit: unit.into(),
        }
    }
}

/// A usage-based price component with its consumption records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePart {
    pub price: Decimal,
    pub duty_free: Decimal,
    pub model: UsageModel,
    /// Usage detail records aggregated into this component
    #[serde(default)]
    pub accounting: Vec<UsageRecord>,
}

impl UsagePart {
    pub fn new(price: Decimal, duty_free: Decimal, unit: impl Into<String>) -> Self {
        Self {
            price,
            duty_free,
            model: UsageModel { unit: unit.into() },
            accounting: Vec::new(),
        }
    }

    pub fn with_usage(mut self, values: impl IntoIterator<Item = Decimal>) -> Self {
        self.accounting.extend(values.into_iter().map(UsageRecord::new));
        self
    }

    /// Sum of the `value` field across every usage record
    ///
    /// `None` on overflow. An entry without usage records consumed nothing.
    pub fn total_consumption(&self) -> Option<Decimal> {
        self.accounting
            .iter()
            .try_fold(Decimal::ZERO, |total, record| total.checked_add(record.value))
    }
}

/// Pricing model of a usage component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageModel {
    /// Unit the fee is charged per, e.g. "call" or "megabyte"
    pub unit: String,
}

/// One usage detail record
///
/// Only `value` matters here; whatever else the accounting system attached
/// is kept untouched in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub value: Decimal,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl UsageRecord {
    pub fn new(value: Decimal) -> Self {
        Self {
            value,
            details: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deserialize_rating_engine_payload() {
        let applied: AppliedCharge = serde_json::from_str(
            r#"{
                "single_payment": [{ "value": "12.00", "duty_free": "10.00" }],
                "accounting": [{
                    "price": "1.50",
                    "duty_free": "1.20",
                    "model": { "unit": "call" },
                    "accounting": [
                        { "value": "3", "unit": "call", "order_id": "1" },
                        { "value": 4 }
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(applied.part_count(), 2);
        assert!(applied.subscription.is_none());

        let usage = &applied.accounting.as_ref().unwrap()[0];
        assert_eq!(usage.total_consumption(), Some(dec!(7)));
        assert_eq!(usage.accounting[0].details["order_id"], "1");
    }

    #[test]
    fn test_empty_usage_consumes_nothing() {
        let usage = UsagePart::new(dec!(1), dec!(1), "call");
        assert_eq!(usage.total_consumption(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_empty_charge() {
        assert!(AppliedCharge::new().is_empty());
        assert!(AppliedCharge::new().with_subscription(Vec::new()).is_empty());
    }
}
