//! Domain Adapters
//!
//! This module provides adapter implementations for the charging domain's
//! ports, connecting them to the PostgreSQL database layer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PgDeadLetterStore, PgSequenceAllocator};
//! use domain_charging::{DeadLetterStore, SequenceAllocator};
//! use std::sync::Arc;
//!
//! let allocator: Arc<dyn SequenceAllocator> = Arc::new(PgSequenceAllocator::new(pool.clone()));
//! let dead_letters: Arc<dyn DeadLetterStore> = Arc::new(PgDeadLetterStore::new(pool));
//! ```

pub mod dead_letter;
pub mod sequence;

pub use dead_letter::PgDeadLetterStore;
pub use sequence::PgSequenceAllocator;
