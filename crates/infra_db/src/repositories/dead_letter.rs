//! Dead-letter repository
//!
//! Stores undeliverable CDR batches in `cdr_dead_letters`, the batch itself
//! as JSONB so it can be replayed exactly as it was built.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use domain_charging::CdrBatch;

use crate::error::DatabaseError;

/// Database row for a dead-lettered batch
#[derive(Debug, Clone, FromRow)]
pub struct DeadLetterRow {
    pub batch_id: Uuid,
    pub entity_id: Uuid,
    pub batch: Json<CdrBatch>,
    pub reason: String,
    pub attempts: i32,
    pub parked_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Data for parking a batch
#[derive(Debug, Clone)]
pub struct NewDeadLetter<'a> {
    pub batch: &'a CdrBatch,
    pub reason: &'a str,
    pub attempts: i32,
}

/// Repository for dead-lettered CDR batches
#[derive(Debug, Clone)]
pub struct DeadLetterRepository {
    pool: PgPool,
}

impl DeadLetterRepository {
    /// Creates a new DeadLetterRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a batch, or resets an already parked one to pending with the
    /// new reason and attempt count
    pub async fn upsert(&self, letter: NewDeadLetter<'_>) -> Result<(), DatabaseError> {
        let now = Utc::now();
        let last_attempt_at = (letter.attempts > 0).then_some(now);

        sqlx::query(
            r#"
            INSERT INTO cdr_dead_letters (
                batch_id, entity_id, batch, reason, attempts, parked_at, last_attempt_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (batch_id) DO UPDATE SET
                reason = EXCLUDED.reason,
                attempts = EXCLUDED.attempts,
                last_attempt_at = EXCLUDED.last_attempt_at,
                delivered_at = NULL
            "#,
        )
        .bind(*letter.batch.id().as_uuid())
        .bind(*letter.batch.entity().as_uuid())
        .bind(Json(letter.batch))
        .bind(letter.reason)
        .bind(letter.attempts)
        .bind(now)
        .bind(last_attempt_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        Ok(())
    }

    /// Undelivered batches, oldest first
    pub async fn find_pending(&self, limit: i64) -> Result<Vec<DeadLetterRow>, DatabaseError> {
        sqlx::query_as::<_, DeadLetterRow>(
            r#"
            SELECT
                batch_id,
                entity_id,
                batch,
                reason,
                attempts,
                parked_at,
                last_attempt_at,
                delivered_at
            FROM cdr_dead_letters
            WHERE delivered_at IS NULL
            ORDER BY parked_at, batch_id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))
    }

    /// Flags a batch as delivered
    pub async fn mark_delivered(&self, batch_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE cdr_dead_letters
            SET delivered_at = now()
            WHERE batch_id = $1
            "#,
        )
        .bind(batch_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("DeadLetter", batch_id));
        }
        Ok(())
    }

    /// Counts one more failed attempt and stores its reason
    pub async fn record_failure(&self, batch_id: Uuid, reason: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE cdr_dead_letters
            SET attempts = attempts + 1,
                reason = $2,
                last_attempt_at = now()
            WHERE batch_id = $1
            "#,
        )
        .bind(batch_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("DeadLetter", batch_id));
        }
        Ok(())
    }

    /// Number of batches still waiting for delivery
    pub async fn count_pending(&self) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM cdr_dead_letters WHERE delivered_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))
    }
}
