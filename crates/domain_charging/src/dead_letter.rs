//! Dead-letter store
//!
//! Batches the settlement system rejected, or that ran out of delivery
//! attempts, are parked here with the reason they failed. They keep their
//! correlation numbers: replaying a parked batch resends the exact records
//! that were built, nothing is re-allocated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use core_kernel::{BatchId, DomainPort, PortError};

use crate::cdr::CdrBatch;

/// A parked batch and its delivery history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub batch: CdrBatch,
    /// Error of the most recent failed attempt
    pub reason: String,
    /// Delivery attempts made so far, including replays
    pub attempts: u32,
    pub parked_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl DeadLetter {
    pub fn new(batch: CdrBatch, reason: impl Into<String>, attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            batch,
            reason: reason.into(),
            attempts,
            parked_at: now,
            last_attempt_at: (attempts > 0).then_some(now),
            delivered_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.delivered_at.is_none()
    }
}

/// Port for durable storage of undeliverable batches
#[async_trait]
pub trait DeadLetterStore: DomainPort {
    /// Parks a batch; parking the same batch again replaces its reason and
    /// attempt count
    async fn park(&self, batch: CdrBatch, reason: String, attempts: u32) -> Result<(), PortError>;

    /// Undelivered batches, oldest first
    async fn pending(&self, limit: usize) -> Result<Vec<DeadLetter>, PortError>;

    /// Flags a parked batch as finally delivered
    async fn mark_delivered(&self, batch_id: BatchId) -> Result<(), PortError>;

    /// Records one more failed replay attempt
    async fn record_failure(&self, batch_id: BatchId, reason: String) -> Result<(), PortError>;
}

/// Dead letters kept in process memory
///
/// Ordered by batch id, which is time-ordered, so replay follows creation
/// order.
#[derive(Debug, Default)]
pub struct InMemoryDeadLetterStore {
    letters: RwLock<BTreeMap<BatchId, DeadLetter>>,
}

impl InMemoryDeadLetterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a parked batch, delivered or not
    pub async fn get(&self, batch_id: BatchId) -> Option<DeadLetter> {
        self.letters.read().await.get(&batch_id).cloned()
    }

    /// Number of batches still waiting for delivery
    pub async fn pending_count(&self) -> usize {
        self.letters
            .read()
            .await
            .values()
            .filter(|letter| letter.is_pending())
            .count()
    }
}

impl DomainPort for InMemoryDeadLetterStore {}

#[async_trait]
impl DeadLetterStore for InMemoryDeadLetterStore {
    async fn park(&self, batch: CdrBatch, reason: String, attempts: u32) -> Result<(), PortError> {
        let letter = DeadLetter::new(batch, reason, attempts);
        self.letters.write().await.insert(letter.batch.id(), letter);
        Ok(())
    }

    async fn pending(&self, limit: usize) -> Result<Vec<DeadLetter>, PortError> {
        Ok(self
            .letters
            .read()
            .await
            .values()
            .filter(|letter| letter.is_pending())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_delivered(&self, batch_id: BatchId) -> Result<(), PortError> {
        let mut letters = self.letters.write().await;
        let letter = letters
            .get_mut(&batch_id)
            .ok_or_else(|| PortError::not_found("DeadLetter", batch_id))?;
        letter.delivered_at = Some(Utc::now());
        Ok(())
    }

    async fn record_failure(&self, batch_id: BatchId, reason: String) -> Result<(), PortError> {
        let mut letters = self.letters.write().await;
        let letter = letters
            .get_mut(&batch_id)
            .ok_or_else(|| PortError::not_found("DeadLetter", batch_id))?;
        letter.attempts = letter.attempts.saturating_add(1);
        letter.reason = reason;
        letter.last_attempt_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::OrganizationId;

    #[tokio::test]
    async fn test_pending_in_creation_order() {
        let store = InMemoryDeadLetterStore::new();
        let entity = OrganizationId::new();
        let first = CdrBatch::new(entity, Vec::new());
        let second = CdrBatch::new(entity, Vec::new());
        let (first_id, second_id) = (first.id(), second.id());

        store.park(second, "rejected".into(), 1).await.unwrap();
        store.park(first, "rejected".into(), 1).await.unwrap();

        let pending = store.pending(10).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|l| l.batch.id()).collect();
        assert_eq!(ids, vec![first_id, second_id]);
    }

    #[tokio::test]
    async fn test_delivered_batches_leave_pending() {
        let store = InMemoryDeadLetterStore::new();
        let batch = CdrBatch::new(OrganizationId::new(), Vec::new());
        let id = batch.id();

        store.park(batch, "timeout".into(), 5).await.unwrap();
        store.record_failure(id, "still down".into()).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().attempts, 6);

        store.mark_delivered(id).await.unwrap();
        assert_eq!(store.pending_count().await, 0);
        assert!(store.get(id).await.unwrap().delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let store = InMemoryDeadLetterStore::new();
        let result = store.mark_delivered(BatchId::new_v7()).await;
        assert!(matches!(result, Err(e) if e.is_not_found()));
    }
}
