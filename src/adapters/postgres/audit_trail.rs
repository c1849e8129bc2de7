//! PostgreSQL implementation of AuditTrail.
//!
//! Entries are ordered by `recorded_seq`, the insertion order.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use super::db_error;
use crate::domain::audit::{AuditAction, AuditEntry};
use crate::domain::foundation::{
    AuditEntryId, AuthorId, DomainError, EntityType, Timestamp, Uid,
};
use crate::domain::versioning::SnapshotRef;
use crate::ports::AuditTrail;

/// PostgreSQL implementation of AuditTrail.
#[derive(Clone)]
pub struct PostgresAuditTrail {
    pool: PgPool,
}

impl PostgresAuditTrail {
    /// Creates a new PostgresAuditTrail.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, column: &str, uid: &Uid) -> Result<Vec<AuditEntry>, DomainError> {
        let sql = format!(
            r#"
            SELECT id, uid, entity_type, scope_uid, action, occurred_at, author,
                   before_ref, after_ref
            FROM audit_entries
            WHERE {} = $1
            ORDER BY recorded_seq
            "#,
            column
        );
        let rows = sqlx::query(&sql)
            .bind(uid.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("fetch audit entries"))?;

        rows.iter().map(row_to_entry).collect()
    }
}

#[async_trait]
impl AuditTrail for PostgresAuditTrail {
    async fn record(&self, entry: AuditEntry) -> Result<(), DomainError> {
        insert_audit_entry(&self.pool, &entry).await
    }

    async fn history_for(&self, uid: &Uid) -> Result<Vec<AuditEntry>, DomainError> {
        self.fetch("uid", uid).await
    }

    async fn history_for_scope(&self, scope_uid: &Uid) -> Result<Vec<AuditEntry>, DomainError> {
        self.fetch("scope_uid", scope_uid).await
    }
}

/// Inserts one entry using any executor, so repositories can write inside
/// their save transaction.
pub(crate) async fn insert_audit_entry<'e, E>(executor: E, entry: &AuditEntry) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    let before = to_json(entry.before.as_ref())?;
    let after = to_json(entry.after.as_ref())?;

    sqlx::query(
        r#"
        INSERT INTO audit_entries (
            id, uid, entity_type, scope_uid, action, occurred_at, author,
            before_ref, after_ref
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.uid.as_str())
    .bind(entry.entity_type.as_str())
    .bind(entry.scope_uid.as_ref().map(|s| s.as_str()))
    .bind(entry.action.as_str())
    .bind(entry.occurred_at.as_datetime())
    .bind(entry.author.as_str())
    .bind(before)
    .bind(after)
    .execute(executor)
    .await
    .map_err(db_error("insert audit entry"))?;

    Ok(())
}

fn to_json(reference: Option<&SnapshotRef>) -> Result<Option<serde_json::Value>, DomainError> {
    reference
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| DomainError::storage(format!("Failed to serialize snapshot reference: {}", e)))
}

fn from_json(value: Option<serde_json::Value>) -> Result<Option<SnapshotRef>, DomainError> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| DomainError::storage(format!("Failed to deserialize snapshot reference: {}", e)))
}

fn row_to_entry(row: &PgRow) -> Result<AuditEntry, DomainError> {
    let decode = db_error("decode audit entry");
    let id: Uuid = row.try_get("id").map_err(&decode)?;
    let uid: String = row.try_get("uid").map_err(&decode)?;
    let entity_type: String = row.try_get("entity_type").map_err(&decode)?;
    let scope_uid: Option<String> = row.try_get("scope_uid").map_err(&decode)?;
    let action: String = row.try_get("action").map_err(&decode)?;
    let occurred_at: chrono::DateTime<chrono::Utc> = row.try_get("occurred_at").map_err(&decode)?;
    let author: String = row.try_get("author").map_err(&decode)?;
    let before: Option<serde_json::Value> = row.try_get("before_ref").map_err(&decode)?;
    let after: Option<serde_json::Value> = row.try_get("after_ref").map_err(&decode)?;

    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(id),
        uid: Uid::new(uid)?,
        entity_type: EntityType::new(entity_type)?,
        scope_uid: scope_uid.map(Uid::new).transpose()?,
        action: action.parse::<AuditAction>()?,
        occurred_at: Timestamp::from_datetime(occurred_at),
        author: AuthorId::new(author)?,
        before: from_json(before)?,
        after: from_json(after)?,
    })
}
