//! CDR manager
//!
//! Composition root of the charging core. One manager serves one contract of
//! one order: it owns the charge context derived from them and drives the
//! adapter, the formatter and the dispatcher for every charge or refund
//! booked against that contract.
//!
//! The caller waits for the batch to be built and numbered, never for its
//! delivery.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::BatchId;

use crate::adapter::PricingModelAdapter;
use crate::applied::AppliedCharge;
use crate::cdr::{CdrBatch, RecordType};
use crate::context::{ChargeContext, Contract, Order};
use crate::dispatch::CdrDispatcher;
use crate::error::ChargingError;
use crate::formatter::CdrFormatter;
use crate::sequence::SequenceAllocator;

/// What the caller learns about a batch it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReceipt {
    /// `None` when the charge had no parts and nothing was dispatched
    pub batch_id: Option<BatchId>,
    pub record_type: RecordType,
    pub records: usize,
    pub first_correlation: Option<u64>,
    pub last_correlation: Option<u64>,
}

impl BatchReceipt {
    fn empty(record_type: RecordType) -> Self {
        Self {
            batch_id: None,
            record_type,
            records: 0,
            first_correlation: None,
            last_correlation: None,
        }
    }

    fn for_batch(batch: &CdrBatch, record_type: RecordType) -> Self {
        let range = batch.correlation_range();
        Self {
            batch_id: Some(batch.id()),
            record_type,
            records: batch.len(),
            first_correlation: range.map(|(first, _)| first),
            last_correlation: range.map(|(_, last)| last),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Generates and dispatches CDRs for one contract
pub struct CdrManager {
    context: ChargeContext,
    adapter: PricingModelAdapter,
    allocator: Arc<dyn SequenceAllocator>,
    dispatcher: Arc<dyn CdrDispatcher>,
}

impl CdrManager {
    /// Builds a manager for `contract` of `order`
    pub fn new(
        order: &Order,
        contract: &Contract,
        allocator: Arc<dyn SequenceAllocator>,
        dispatcher: Arc<dyn CdrDispatcher>,
    ) -> Self {
        Self::with_context(ChargeContext::new(order, contract), allocator, dispatcher)
    }

    pub fn with_context(
        context: ChargeContext,
        allocator: Arc<dyn SequenceAllocator>,
        dispatcher: Arc<dyn CdrDispatcher>,
    ) -> Self {
        Self {
            adapter: PricingModelAdapter::new(context.currency()),
            context,
            allocator,
            dispatcher,
        }
    }

    pub fn context(&self) -> &ChargeContext {
        &self.context
    }

    /// Books an applied charge
    ///
    /// Produces one charge record per priced component, single payments
    /// first, then subscriptions, then usage. A charge without components
    /// produces no batch.
    ///
    /// # Errors
    ///
    /// `ChargingError::Adapter` if the applied charge is inconsistent (no
    /// number is allocated), `ChargingError::Allocation` if the counter fails
    /// (nothing is dispatched). Delivery problems are never reported here.
    #[instrument(skip(self, applied), fields(order = %self.context.order(), parts = applied.part_count()))]
    pub async fn generate(
        &self,
        applied: &AppliedCharge,
        time_stamp: DateTime<Utc>,
    ) -> Result<BatchReceipt, ChargingError> {
        let parts = self.adapter.decompose(applied)?;
        if parts.is_empty() {
            info!("Applied charge has no priced parts, nothing to dispatch");
            return Ok(BatchReceipt::empty(RecordType::Charge));
        }

        let records = CdrFormatter::new(&self.context, self.allocator.as_ref())
            .format(parts, RecordType::Charge, time_stamp)
            .await?;

        let batch = CdrBatch::new(self.context.provider_id(), records);
        Ok(self.hand_off(batch, RecordType::Charge).await)
    }

    /// Books a refund of `price`, of which `duty_free` is untaxed
    ///
    /// Always a single refund record, whatever the shape of the refunded
    /// charge.
    #[instrument(skip(self), fields(order = %self.context.order()))]
    pub async fn refund(
        &self,
        price: Decimal,
        duty_free: Decimal,
        time_stamp: DateTime<Utc>,
    ) -> Result<BatchReceipt, ChargingError> {
        let part = self.adapter.refund(price, duty_free)?;

        let records = CdrFormatter::new(&self.context, self.allocator.as_ref())
            .format(vec![part], RecordType::Refund, time_stamp)
            .await?;

        let batch = CdrBatch::new(self.context.provider_id(), records);
        Ok(self.hand_off(batch, RecordType::Refund).await)
    }

    async fn hand_off(&self, batch: CdrBatch, record_type: RecordType) -> BatchReceipt {
        let receipt = BatchReceipt::for_batch(&batch, record_type);

        info!(
            batch_id = %batch.id(),
            record_type = %record_type,
            records = receipt.records,
            first_correlation = ?receipt.first_correlation,
            last_correlation = ?receipt.last_correlation,
            "CDR batch built, dispatching"
        );
        self.dispatcher.dispatch(batch).await;

        receipt
    }
}
