//! Charging domain errors
//!
//! Construction-time failures (`AllocationError`, `AdapterError`) reach the
//! charging caller through `ChargingError`. Delivery failures
//! (`DispatchError`) stay inside the dispatcher and end up in logs and the
//! dead-letter store.

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{MoneyError, OrganizationId, PortError};

/// Correlation counter could not be incremented
#[derive(Debug, Error)]
pub enum AllocationError {
    /// No counter exists for the billing entity
    #[error("Billing entity not found: {0}")]
    EntityNotFound(OrganizationId),

    /// The counter store could not be reached or failed mid-operation
    #[error("Correlation counter store unavailable: {message}")]
    StoreUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The counter cannot be incremented without wrapping
    #[error("Correlation counter exhausted for billing entity {0}")]
    CounterExhausted(OrganizationId),
}

impl AllocationError {
    /// Creates a StoreUnavailable error without an underlying source
    pub fn unavailable(message: impl Into<String>) -> Self {
        AllocationError::StoreUnavailable {
            message: message.into(),
            source: None,
        }
    }
}

/// The applied charge handed over by the rating engine is inconsistent
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Tax would come out negative
    #[error("Duty-free amount {duty_free} exceeds cost {cost} for {event}")]
    DutyFreeExceedsCost {
        event: String,
        cost: Decimal,
        duty_free: Decimal,
    },

    /// Usage records for one accounting entry add up below zero
    #[error("Negative consumption {total} for usage unit {unit:?}")]
    NegativeConsumption {
        unit: String,
        total: Decimal,
    },

    /// Amount arithmetic failed
    #[error("Amount calculation failed for {event}: {source}")]
    Calculation {
        event: String,
        #[source]
        source: MoneyError,
    },
}

/// Error surfaced to the charging caller by `CdrManager`
///
/// Either variant means no batch was dispatched. Correlation numbers already
/// allocated for the failed batch are not returned to the counter.
#[derive(Debug, Error)]
pub enum ChargingError {
    #[error("Correlation number allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Invalid applied charge: {0}")]
    Adapter(#[from] AdapterError),
}

/// Delivery of a CDR batch to the settlement system failed
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatch queue had no free slot
    #[error("Dispatch queue is full ({capacity} batches)")]
    QueueFull { capacity: usize },

    /// The dispatcher has been shut down
    #[error("Dispatch queue is closed")]
    QueueClosed,

    /// The settlement system refused the batch; retrying will not help
    #[error("Settlement system rejected the batch on attempt {attempts}: {source}")]
    Rejected {
        attempts: u32,
        #[source]
        source: PortError,
    },

    /// Every attempt allowed by the retry policy failed
    #[error("Delivery gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last_error: PortError,
    },
}

impl DispatchError {
    /// Delivery attempts made before the batch was given up on
    pub fn attempts(&self) -> u32 {
        match self {
            DispatchError::QueueFull { .. } | DispatchError::QueueClosed => 0,
            DispatchError::Rejected { attempts, .. }
            | DispatchError::RetriesExhausted { attempts, .. } => *attempts,
        }
    }
}
