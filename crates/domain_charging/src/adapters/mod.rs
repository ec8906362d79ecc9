//! External Adapters for the Charging Domain
//!
//! Implementations of `SettlementPort` that talk to real settlement systems.
//! Test doubles live in [`crate::mock`].
//!
//! ```rust,ignore
//! use domain_charging::adapters::{RevenueSharingAdapter, RevenueSharingConfig};
//! use domain_charging::SettlementPort;
//! use std::sync::Arc;
//!
//! let adapter = RevenueSharingAdapter::new(RevenueSharingConfig::default())?;
//! let port: Arc<dyn SettlementPort> = Arc::new(adapter);
//! ```

pub mod revenue_sharing;

pub use revenue_sharing::{RevenueSharingAdapter, RevenueSharingConfig};
