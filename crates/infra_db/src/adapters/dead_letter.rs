//! PostgreSQL Dead-Letter Store
//!
//! Implements `DeadLetterStore` on top of `DeadLetterRepository`, so parked
//! batches survive restarts and can be replayed by the relay.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{
    AdapterHealth, BatchId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};
use domain_charging::{CdrBatch, DeadLetter, DeadLetterStore};

use crate::repositories::dead_letter::{DeadLetterRepository, DeadLetterRow, NewDeadLetter};

/// PostgreSQL-backed implementation of the DeadLetterStore trait
#[derive(Debug, Clone)]
pub struct PgDeadLetterStore {
    repository: DeadLetterRepository,
    pool: PgPool,
}

impl PgDeadLetterStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DeadLetterRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &DeadLetterRepository {
        &self.repository
    }
}

impl From<DeadLetterRow> for DeadLetter {
    fn from(row: DeadLetterRow) -> Self {
        DeadLetter {
            batch: row.batch.0,
            reason: row.reason,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            parked_at: row.parked_at,
            last_attempt_at: row.last_attempt_at,
            delivered_at: row.delivered_at,
        }
    }
}

impl DomainPort for PgDeadLetterStore {}

#[async_trait]
impl DeadLetterStore for PgDeadLetterStore {
    #[instrument(skip(self, batch, reason), fields(batch_id = %batch.id()))]
    async fn park(&self, batch: CdrBatch, reason: String, attempts: u32) -> Result<(), PortError> {
        self.repository
            .upsert(NewDeadLetter {
                batch: &batch,
                reason: &reason,
                attempts: i32::try_from(attempts).unwrap_or(i32::MAX),
            })
            .await?;
        Ok(())
    }

    async fn pending(&self, limit: usize) -> Result<Vec<DeadLetter>, PortError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.repository.find_pending(limit).await?;
        Ok(rows.into_iter().map(DeadLetter::from).collect())
    }

    async fn mark_delivered(&self, batch_id: BatchId) -> Result<(), PortError> {
        self.repository
            .mark_delivered(*batch_id.as_uuid())
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    PortError::not_found("DeadLetter", batch_id)
                } else {
                    e.into()
                }
            })
    }

    async fn record_failure(&self, batch_id: BatchId, reason: String) -> Result<(), PortError> {
        self.repository
            .record_failure(*batch_id.as_uuid(), &reason)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    PortError::not_found("DeadLetter", batch_id)
                } else {
                    e.into()
                }
            })
    }
}

#[async_trait]
impl HealthCheckable for PgDeadLetterStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-dead-letter-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-dead-letter-store".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}
