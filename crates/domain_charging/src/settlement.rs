//! Settlement port
//!
//! The settlement (revenue sharing) system receives every finished batch in a
//! single call. This module defines the port the dispatcher delivers through
//! and the record layout the settlement system expects on the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, HealthCheckable, PortError};

use crate::cdr::{CdrBatch, ChargeDetailRecord};

/// Port for delivering CDR batches to the settlement system
#[async_trait]
pub trait SettlementPort: DomainPort + HealthCheckable {
    /// Submits every record of the batch in one call
    ///
    /// Implementations report failures through `PortError` so the dispatcher
    /// can tell transient failures from rejections.
    async fn submit(&self, batch: &CdrBatch) -> Result<(), PortError>;
}

/// One CDR in the settlement system's format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    pub cdr_source: String,
    pub product_class: String,
    pub correlation_number: String,
    /// RFC 3339 in UTC with a `Z` suffix
    pub timestamp: String,
    pub application: String,
    pub transaction_type: String,
    pub event: String,
    pub reference_code: String,
    pub description: String,
    pub charged_amount: String,
    pub charged_tax_amount: String,
    pub currency: String,
    pub customer_id: String,
    pub app_provider: String,
}

impl SettlementRecord {
    /// Maps a CDR onto the wire record, tagging it with `cdr_source`
    pub fn from_cdr(cdr: &ChargeDetailRecord, cdr_source: &str) -> Self {
        Self {
            cdr_source: cdr_source.to_string(),
            product_class: cdr.product_class().to_string(),
            correlation_number: cdr.correlation(),
            timestamp: cdr
                .time_stamp()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            application: cdr.offering().to_string(),
            transaction_type: cdr.record_type().code().to_string(),
            event: cdr.event().to_string(),
            reference_code: cdr.order().to_string(),
            description: cdr.description().to_string(),
            charged_amount: cdr.cost_value().to_string(),
            charged_tax_amount: cdr.tax_value().to_string(),
            currency: cdr.cost_currency().to_string(),
            customer_id: cdr.customer().to_string(),
            app_provider: cdr.provider().to_string(),
        }
    }
}

/// Maps a whole batch, keeping record order
pub fn encode_batch(batch: &CdrBatch, cdr_source: &str) -> Vec<SettlementRecord> {
    batch
        .records()
        .iter()
        .map(|cdr| SettlementRecord::from_cdr(cdr, cdr_source))
        .collect()
}
