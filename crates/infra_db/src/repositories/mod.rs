//! Repository implementations
//!
//! Repositories encapsulate the SQL for one table each and map between
//! database rows and plain Rust types. Domain ports are implemented on top
//! of them in [`crate::adapters`].
//!
//! Queries are built at runtime with `sqlx::query`, so the crate compiles
//! without a live database.

pub mod counter;
pub mod dead_letter;

pub use counter::CounterRepository;
pub use dead_letter::DeadLetterRepository;
