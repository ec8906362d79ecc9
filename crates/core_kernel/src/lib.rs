//! Core Kernel - Foundational types shared by the charging crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Currency-aware amounts with exact decimal arithmetic
//! - Strongly-typed identifiers for billing entities and CDR batches
//! - Port contracts and the shared `PortError` used by every adapter

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{OrganizationId, BatchId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    CircuitBreakerConfig,
};
