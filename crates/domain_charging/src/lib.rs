//! Charging Domain - Charge Detail Record Generation
//!
//! This crate turns completed charges and refunds into charge detail records
//! (CDRs) and forwards them to the revenue sharing system.
//!
//! # Pipeline
//!
//! - **Pricing-model adapter**: flattens an applied charge (single payments,
//!   subscriptions, usage) into priced parts with their descriptions
//! - **Sequence allocator**: hands out strictly increasing correlation
//!   numbers per billing entity, safe under concurrent charges
//! - **Formatter**: numbers each part and stamps it with the charge context
//! - **Dispatcher**: delivers finished batches in the background, retrying
//!   transient failures and parking the rest in a dead-letter store
//!
//! `CdrManager` ties these together for one contract of one order.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_charging::{AppliedCharge, CdrManager, RecurringPart};
//! use rust_decimal_macros::dec;
//!
//! let manager = CdrManager::new(&order, &contract, allocator, dispatcher);
//!
//! let applied = AppliedCharge::new()
//!     .with_subscription(vec![RecurringPart::new(dec!(10.00), dec!(8.26), "monthly")]);
//!
//! let receipt = manager.generate(&applied, Utc::now()).await?;
//! assert_eq!(receipt.records, 1);
//! ```

pub mod adapter;
pub mod adapters;
pub mod applied;
pub mod cdr;
pub mod context;
pub mod dead_letter;
pub mod dispatch;
pub mod error;
pub mod formatter;
pub mod manager;
pub mod sequence;
pub mod settlement;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use adapter::{PricedPart, PricingModelAdapter};
pub use adapters::{RevenueSharingAdapter, RevenueSharingConfig};
pub use applied::{AppliedCharge, OneTimePart, RecurringPart, UsageModel, UsagePart, UsageRecord};
pub use cdr::{CdrBatch, ChargeDetailRecord, RecordType};
pub use context::{ChargeContext, Contract, Offering, Order, Organization, PricingModel};
pub use dead_letter::{DeadLetter, DeadLetterStore, InMemoryDeadLetterStore};
pub use dispatch::{
    CdrDispatcher, DispatchHandle, DispatchOutcome, DispatcherConfig, QueuedDispatcher, RetryPolicy,
};
pub use error::{AdapterError, AllocationError, ChargingError, DispatchError};
pub use formatter::CdrFormatter;
pub use manager::{BatchReceipt, CdrManager};
pub use sequence::{InMemorySequenceAllocator, SequenceAllocator};
pub use settlement::{encode_batch, SettlementPort, SettlementRecord};
