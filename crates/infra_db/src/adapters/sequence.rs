//! PostgreSQL Sequence Allocator
//!
//! Implements `SequenceAllocator` on top of `CounterRepository`. Each call is
//! one atomic `UPDATE ... RETURNING`, so any number of processes can number
//! CDRs for the same billing entity without coordinating.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, OrganizationId};
use domain_charging::{AllocationError, SequenceAllocator};

use crate::error::DatabaseError;
use crate::repositories::CounterRepository;

/// PostgreSQL-backed correlation counters
#[derive(Debug, Clone)]
pub struct PgSequenceAllocator {
    repository: CounterRepository,
    pool: PgPool,
}

impl PgSequenceAllocator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CounterRepository::new(pool.clone()),
            pool,
        }
    }

    /// Creates the entity's counter if it does not exist yet
    ///
    /// Called when a provider organization is created.
    pub async fn ensure_entity(&self, entity: OrganizationId) -> Result<(), AllocationError> {
        let created = self
            .repository
            .ensure_entity(*entity.as_uuid())
            .await
            .map_err(store_unavailable)?;

        if created {
            debug!(entity = %entity, "Correlation counter created");
        }
        Ok(())
    }

    /// Last value issued for the entity
    pub async fn current(&self, entity: OrganizationId) -> Result<Option<u64>, AllocationError> {
        self.repository
            .current(*entity.as_uuid())
            .await
            .map_err(store_unavailable)?
            .map(|value| to_correlation(entity, value))
            .transpose()
    }

    pub fn repository(&self) -> &CounterRepository {
        &self.repository
    }
}

fn store_unavailable(error: DatabaseError) -> AllocationError {
    AllocationError::StoreUnavailable {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
}

fn to_correlation(entity: OrganizationId, value: i64) -> Result<u64, AllocationError> {
    u64::try_from(value).map_err(|_| {
        AllocationError::unavailable(format!(
            "Negative correlation number {} stored for {}",
            value, entity
        ))
    })
}

impl DomainPort for PgSequenceAllocator {}

#[async_trait]
impl SequenceAllocator for PgSequenceAllocator {
    #[instrument(skip(self), fields(entity = %entity))]
    async fn next(&self, entity: OrganizationId) -> Result<u64, AllocationError> {
        match self.repository.increment(*entity.as_uuid()).await {
            Ok(Some(value)) => to_correlation(entity, value),
            Ok(None) => Err(AllocationError::EntityNotFound(entity)),
            Err(DatabaseError::OutOfRange(_)) => Err(AllocationError::CounterExhausted(entity)),
            Err(e) => {
                warn!(error = %e, "Correlation counter increment failed");
                Err(store_unavailable(e))
            }
        }
    }
}

#[async_trait]
impl HealthCheckable for PgSequenceAllocator {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: "postgres-sequence-allocator".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_stored_value_is_rejected() {
        let entity = OrganizationId::new();
        assert_eq!(to_correlation(entity, 42).unwrap(), 42);
        assert!(matches!(
            to_correlation(entity, -1),
            Err(AllocationError::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn test_database_errors_keep_their_source() {
        let error = store_unavailable(DatabaseError::PoolExhausted);
        assert!(std::error::Error::source(&error).is_some());
    }
}
