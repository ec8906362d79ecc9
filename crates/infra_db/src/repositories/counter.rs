//! Correlation counter repository
//!
//! One row per billing entity in `billing_entities`. The counter is only
//! ever changed by a single `UPDATE ... RETURNING`, which PostgreSQL applies
//! under a row lock, so concurrent increments serialize on the row and each
//! caller gets its own value.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for per-entity correlation counters
#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: PgPool,
}

impl CounterRepository {
    /// Creates a new CounterRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the entity's counter at zero unless it already exists
    ///
    /// # Returns
    ///
    /// `true` if a new counter was created
    pub async fn ensure_entity(&self, entity_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO billing_entities (entity_id)
            VALUES ($1)
            ON CONFLICT (entity_id) DO NOTHING
            "#,
        )
        .bind(entity_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Increments the counter and returns the new value
    ///
    /// # Returns
    ///
    /// `None` if the entity has no counter
    ///
    /// # Errors
    ///
    /// `DatabaseError::OutOfRange` once the counter reaches the BIGINT limit
    pub async fn increment(&self, entity_id: Uuid) -> Result<Option<i64>, DatabaseError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE billing_entities
            SET correlation_number = correlation_number + 1
            WHERE entity_id = $1
            RETURNING correlation_number
            "#,
        )
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))
    }

    /// Last value issued for the entity
    pub async fn current(&self, entity_id: Uuid) -> Result<Option<i64>, DatabaseError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT correlation_number
            FROM billing_entities
            WHERE entity_id = $1
            "#,
        )
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from(&e))
    }
}
