//! Charge detail records
//!
//! A CDR is the immutable outcome of one priced part: its correlation
//! number, amounts, labels and the flattened charge context. Records only
//! come out of the formatter; everything else reads them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BatchId, Currency, OrganizationId};

use crate::adapter::PricedPart;
use crate::context::ChargeContext;

/// Whether a record books a charge or a refund
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "C")]
    Charge,
    #[serde(rename = "R")]
    Refund,
}

impl RecordType {
    /// Single-letter code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            RecordType::Charge => "C",
            RecordType::Refund => "R",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Correlation numbers travel as strings so no consumer parses them into a
/// float and loses digits.
mod correlation_as_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// One charge detail record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeDetailRecord {
    #[serde(with = "correlation_as_string")]
    correlation: u64,
    cost_value: Decimal,
    tax_value: Decimal,
    event: String,
    description: String,
    record_type: RecordType,
    time_stamp: DateTime<Utc>,
    provider: String,
    offering: String,
    customer: String,
    product_class: String,
    cost_currency: Currency,
    order: String,
}

impl ChargeDetailRecord {
    /// Stamps a priced part with its correlation number and the context
    pub(crate) fn new(
        correlation: u64,
        part: PricedPart,
        tax_value: Decimal,
        record_type: RecordType,
        time_stamp: DateTime<Utc>,
        context: &ChargeContext,
    ) -> Self {
        Self {
            correlation,
            cost_value: part.cost.amount(),
            tax_value,
            event: part.event.to_string(),
            description: part.description,
            record_type,
            time_stamp,
            provider: context.provider().to_string(),
            offering: context.offering().to_string(),
            customer: context.customer().to_string(),
            product_class: context.product_class().to_string(),
            cost_currency: context.currency(),
            order: context.order().to_string(),
        }
    }

    pub fn correlation_number(&self) -> u64 {
        self.correlation
    }

    /// Correlation number in its wire form
    pub fn correlation(&self) -> String {
        self.correlation.to_string()
    }

    pub fn cost_value(&self) -> Decimal {
        self.cost_value
    }

    pub fn tax_value(&self) -> Decimal {
        self.tax_value
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn time_stamp(&self) -> DateTime<Utc> {
        self.time_stamp
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn offering(&self) -> &str {
        &self.offering
    }

    pub fn customer(&self) -> &str {
        &self.customer
    }

    pub fn product_class(&self) -> &str {
        &self.product_class
    }

    pub fn cost_currency(&self) -> Currency {
        self.cost_currency
    }

    pub fn order(&self) -> &str {
        &self.order
    }
}

/// The records of one charge or refund, delivered together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrBatch {
    id: BatchId,
    entity: OrganizationId,
    records: Vec<ChargeDetailRecord>,
    created_at: DateTime<Utc>,
}

impl CdrBatch {
    pub fn new(entity: OrganizationId, records: Vec<ChargeDetailRecord>) -> Self {
        Self {
            id: BatchId::new_v7(),
            entity,
            records,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Billing entity the records were numbered against
    pub fn entity(&self) -> OrganizationId {
        self.entity
    }

    pub fn records(&self) -> &[ChargeDetailRecord] {
        &self.records
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last correlation numbers of the batch
    pub fn correlation_range(&self) -> Option<(u64, u64)> {
        let first = self.records.first()?.correlation_number();
        let last = self.records.last()?.correlation_number();
        Some((first, last))
    }
}
