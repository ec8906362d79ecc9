//! Correlation number allocation
//!
//! Every billing entity owns one counter holding the last correlation number
//! it issued. `SequenceAllocator::next` increments and reads that counter in
//! one atomic step, so any number of concurrent charges against the same
//! provider each receive a distinct number and the counter never skips or
//! repeats a value.
//!
//! # Implementations
//!
//! - [`InMemorySequenceAllocator`]: atomics behind a keyed map, for single
//!   process deployments and tests
//! - `infra_db::PgSequenceAllocator`: a single `UPDATE ... RETURNING` against
//!   the billing entity row

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{DomainPort, OrganizationId};

use crate::error::AllocationError;

/// Port for per-entity correlation counters
#[async_trait]
pub trait SequenceAllocator: DomainPort {
    /// Increments the entity's counter and returns the new value
    ///
    /// # Errors
    ///
    /// Fails when the entity has no counter or the store cannot be reached.
    /// No number is issued in that case.
    async fn next(&self, entity: OrganizationId) -> Result<u64, AllocationError>;
}

/// Keyed atomic counters held in process memory
#[derive(Debug, Default)]
pub struct InMemorySequenceAllocator {
    counters: RwLock<HashMap<OrganizationId, Arc<AtomicU64>>>,
}

impl InMemorySequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter starting at zero; an existing counter is kept as is
    pub async fn register(&self, entity: OrganizationId) {
        self.register_at(entity, 0).await;
    }

    /// Creates a counter whose last issued value is `last_issued`
    ///
    /// Used to resume numbering for an entity migrated from another store.
    pub async fn register_at(&self, entity: OrganizationId, last_issued: u64) {
        self.counters
            .write()
            .await
            .entry(entity)
            .or_insert_with(|| Arc::new(AtomicU64::new(last_issued)));
    }

    /// Last value issued for the entity, if it has a counter
    pub async fn current(&self, entity: OrganizationId) -> Option<u64> {
        self.counters
            .read()
            .await
            .get(&entity)
            .map(|counter| counter.load(Ordering::SeqCst))
    }
}

impl DomainPort for InMemorySequenceAllocator {}

#[async_trait]
impl SequenceAllocator for InMemorySequenceAllocator {
    async fn next(&self, entity: OrganizationId) -> Result<u64, AllocationError> {
        let counter = self
            .counters
            .read()
            .await
            .get(&entity)
            .cloned()
            .ok_or(AllocationError::EntityNotFound(entity))?;

        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(|_| AllocationError::CounterExhausted(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counter_starts_at_one() {
        let allocator = InMemorySequenceAllocator::new();
        let entity = OrganizationId::new();
        allocator.register(entity).await;

        assert_eq!(allocator.next(entity).await.unwrap(), 1);
        assert_eq!(allocator.next(entity).await.unwrap(), 2);
        assert_eq!(allocator.current(entity).await, Some(2));
    }

    #[tokio::test]
    async fn test_register_keeps_existing_counter() {
        let allocator = InMemorySequenceAllocator::new();
        let entity = OrganizationId::new();
        allocator.register_at(entity, 41).await;
        allocator.register(entity).await;

        assert_eq!(allocator.next(entity).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_unknown_entity() {
        let allocator = InMemorySequenceAllocator::new();
        let entity = OrganizationId::new();

        assert!(matches!(
            allocator.next(entity).await,
            Err(AllocationError::EntityNotFound(id)) if id == entity
        ));
    }

    #[tokio::test]
    async fn test_exhausted_counter_is_not_wrapped() {
        let allocator = InMemorySequenceAllocator::new();
        let entity = OrganizationId::new();
        allocator.register_at(entity, u64::MAX).await;

        assert!(matches!(
            allocator.next(entity).await,
            Err(AllocationError::CounterExhausted(_))
        ));
        assert_eq!(allocator.current(entity).await, Some(u64::MAX));
    }

    #[tokio::test]
    async fn test_entities_are_independent() {
        let allocator = InMemorySequenceAllocator::new();
        let a = OrganizationId::new();
        let b = OrganizationId::new();
        allocator.register(a).await;
        allocator.register_at(b, 100).await;

        assert_eq!(allocator.next(a).await.unwrap(), 1);
        assert_eq!(allocator.next(b).await.unwrap(), 101);
        assert_eq!(allocator.next(a).await.unwrap(), 2);
    }
}
