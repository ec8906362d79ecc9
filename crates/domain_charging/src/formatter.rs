//! CDR formatter
//!
//! Turns priced parts into charge detail records. Every part gets its own
//! correlation number from the provider's counter, in the order the parts
//! were given.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::adapter::PricedPart;
use crate::cdr::{ChargeDetailRecord, RecordType};
use crate::context::ChargeContext;
use crate::error::ChargingError;
use crate::sequence::SequenceAllocator;

/// Formats priced parts for one charge context
pub struct CdrFormatter<'a> {
    context: &'a ChargeContext,
    allocator: &'a dyn SequenceAllocator,
}

impl<'a> CdrFormatter<'a> {
    pub fn new(context: &'a ChargeContext, allocator: &'a dyn SequenceAllocator) -> Self {
        Self { context, allocator }
    }

    /// Produces one record per part, all stamped with `time_stamp`
    ///
    /// Taxes are computed for every part before the first number is
    /// allocated, so an inconsistent part never burns a correlation number.
    ///
    /// # Errors
    ///
    /// The first allocation failure aborts the batch. Numbers already issued
    /// for earlier parts stay consumed.
    #[instrument(
        skip(self, parts),
        fields(provider = %self.context.provider_id(), parts = parts.len())
    )]
    pub async fn format(
        &self,
        parts: Vec<PricedPart>,
        record_type: RecordType,
        time_stamp: DateTime<Utc>,
    ) -> Result<Vec<ChargeDetailRecord>, ChargingError> {
        let taxed = parts
            .into_iter()
            .map(|part| part.tax().map(|tax| (part, tax.amount())))
            .collect::<Result<Vec<_>, _>>()?;

        let entity = self.context.provider_id();
        let mut records = Vec::with_capacity(taxed.len());

        for (part, tax) in taxed {
            let correlation = match self.allocator.next(entity).await {
                Ok(number) => number,
                Err(e) => {
                    warn!(
                        entity = %entity,
                        allocated = records.len(),
                        error = %e,
                        "Correlation allocation failed, discarding batch"
                    );
                    return Err(e.into());
                }
            };

            debug!(correlation, event = part.event, "CDR formatted");
            records.push(ChargeDetailRecord::new(
                correlation,
                part,
                tax,
                record_type,
                time_stamp,
                self.context,
            ));
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::PricingModelAdapter;
    use crate::applied::{AppliedCharge, OneTimePart, RecurringPart};
    use crate::context::{Contract, Offering, Order, Organization, PricingModel};
    use crate::sequence::InMemorySequenceAllocator;
    use core_kernel::{Currency, OrganizationId};
    use rust_decimal_macros::dec;

    fn context() -> ChargeContext {
        let order = Order {
            order_id: "10".to_string(),
            owner_organization: Organization::new(OrganizationId::new(), "customer"),
        };
        let contract = Contract {
            item_id: "20".to_string(),
            offering: Offering {
                off_id: "off".to_string(),
                name: "Storage".to_string(),
                version: "1.0".to_string(),
                owner_organization: Organization::new(OrganizationId::new(), "provider"),
            },
            revenue_class: "subscription".to_string(),
            pricing_model: PricingModel {
                general_currency: Currency::EUR,
            },
        };
        ChargeContext::new(&order, &contract)
    }

    #[tokio::test]
    async fn test_records_follow_part_order() {
        let context = context();
        let allocator = InMemorySequenceAllocator::new();
        allocator.register_at(context.provider_id(), 7).await;

        let parts = PricingModelAdapter::new(Currency::EUR)
            .decompose(
                &AppliedCharge::new()
                    .with_single_payment(vec![OneTimePart::new(dec!(100.00), dec!(80.00))])
                    .with_subscription(vec![RecurringPart::new(dec!(10), dec!(8), "monthly")]),
            )
            .unwrap();

        let now = Utc::now();
        let records = CdrFormatter::new(&context, &allocator)
            .format(parts, RecordType::Charge, now)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].correlation(), "8");
        assert_eq!(records[0].tax_value(), dec!(20.00));
        assert_eq!(records[1].correlation(), "9");
        assert!(records.iter().all(|r| r.time_stamp() == now));
        assert!(records.iter().all(|r| r.order() == "10 20"));
    }

    #[tokio::test]
    async fn test_unregistered_provider_fails() {
        let context = context();
        let allocator = InMemorySequenceAllocator::new();
        let part = PricingModelAdapter::new(Currency::EUR)
            .refund(dec!(1), dec!(1))
            .unwrap();

        let result = CdrFormatter::new(&context, &allocator)
            .format(vec![part], RecordType::Refund, Utc::now())
            .await;

        assert!(matches!(result, Err(ChargingError::Allocation(_))));
    }
}
