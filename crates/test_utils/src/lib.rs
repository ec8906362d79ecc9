//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! charging test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built orders, contracts and wired-up managers
//! - `builders`: Builder for applied charges
//! - `database`: PostgreSQL test containers with the schema applied
//! - `assertions`: Custom assertion helpers for CDR batches
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
