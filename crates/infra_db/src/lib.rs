//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the charging core using SQLx:
//!
//! - **Correlation counters**: one row per billing entity, incremented with a
//!   single atomic `UPDATE ... RETURNING`
//! - **Dead letters**: undeliverable CDR batches kept as JSONB for replay
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgSequenceAllocator};
//!
//! let pool = create_pool(&DatabaseConfig::new("postgres://localhost/charging")).await?;
//! run_migrations(&pool).await?;
//!
//! let allocator = PgSequenceAllocator::new(pool);
//! allocator.ensure_entity(provider_id).await?;
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::{PgDeadLetterStore, PgSequenceAllocator};
