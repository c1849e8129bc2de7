//! PostgreSQL uid counters.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::db_error;
use crate::domain::foundation::{DomainError, EntityType, Uid};
use crate::ports::UidGenerator;

/// Counters in `uid_counters`, incremented with a single upsert.
#[derive(Clone)]
pub struct PostgresUidGenerator {
    pool: PgPool,
    padding: usize,
}

impl PostgresUidGenerator {
    /// Creates a new PostgresUidGenerator.
    pub fn new(pool: PgPool, padding: usize) -> Self {
        Self { pool, padding }
    }
}

#[async_trait]
impl UidGenerator for PostgresUidGenerator {
    async fn next_uid(&self, entity_type: &EntityType) -> Result<Uid, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO uid_counters (entity_type, count)
            VALUES ($1, 1)
            ON CONFLICT (entity_type) DO UPDATE SET count = uid_counters.count + 1
            RETURNING count
            "#,
        )
        .bind(entity_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("increment uid counter"))?;

        let count: i64 = row.try_get("count").map_err(db_error("decode uid counter"))?;
        Ok(Uid::generated(entity_type, count as u64, self.padding))
    }
}
