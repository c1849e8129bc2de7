//! PostgreSQL implementation of LibraryItemRepository.
//!
//! Each save runs in one transaction: the header row is locked with
//! `FOR UPDATE`, the base sequence is re-checked, the value is upserted by
//! content hash, the previous open version is closed, the new version row
//! and pointers are written, dependency edges follow the item and the
//! audit entry is inserted.
//!
//! Latest and status lookups read the pointer columns of the header row
//! and fetch one version by sequence.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use std::marker::PhantomData;
use uuid::Uuid;

use super::{db_error, delete_incoming_edges, insert_audit_entry, insert_dependency};
use crate::adapters::errors::{item_not_found, nothing_to_save, snapshot_not_found, stale_base, uid_taken};
use crate::domain::audit::AuditEntry;
use crate::domain::cascade::EdgeChange;
use crate::domain::foundation::{
    AuthorId, DomainError, EntityType, SnapshotId, Timestamp, Uid, ValueId,
};
use crate::domain::versioning::{
    Deletion, LibraryItemStatus, Pointers, Snapshot, SnapshotRef, ValueObject, VersionFilter,
    VersionMetadata, VersionNumber, VersionedItem,
};
use crate::ports::{LibraryItemRepository, SaveReceipt, StoredItem};

const SNAPSHOT_COLUMNS: &str = r#"
    SELECT v.snapshot_id, v.sequence, v.status, v.major, v.minor, v.author,
           v.start_date, v.end_date, v.change_description, val.payload
    FROM library_item_versions v
    JOIN library_item_values val ON val.id = v.value_id
    WHERE v.uid = "#;

/// Header row of a live item.
struct Root {
    library_name: String,
    pointers: Pointers,
}

/// PostgreSQL implementation of LibraryItemRepository for one entity type.
pub struct PostgresLibraryItemRepository<V: ValueObject> {
    pool: PgPool,
    entity_type: EntityType,
    _value: PhantomData<fn() -> V>,
}

impl<V: ValueObject> Clone for PostgresLibraryItemRepository<V> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            entity_type: self.entity_type.clone(),
            _value: PhantomData,
        }
    }
}

impl<V: ValueObject> PostgresLibraryItemRepository<V> {
    /// Creates a new PostgresLibraryItemRepository.
    pub fn new(pool: PgPool, entity_type: EntityType) -> Self {
        Self {
            pool,
            entity_type,
            _value: PhantomData,
        }
    }

    /// Returns the header row of a live item, or `NotFound`.
    async fn live_root(&self, uid: &Uid) -> Result<Root, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT library_name, latest_sequence, latest_draft, latest_final, latest_retired
            FROM library_item_roots
            WHERE uid = $1 AND entity_type = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(uid.as_str())
        .bind(self.entity_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch library item"))?
        .ok_or_else(|| item_not_found(&self.entity_type, uid))?;

        let decode = db_error("decode library item");
        let pointer = |column: &str| -> Result<Option<u64>, DomainError> {
            let value: Option<i64> = row.try_get(column).map_err(&decode)?;
            Ok(value.map(|s| s as u64))
        };
        Ok(Root {
            library_name: row.try_get("library_name").map_err(&decode)?,
            pointers: Pointers {
                latest: pointer("latest_sequence")?,
                latest_draft: pointer("latest_draft")?,
                latest_final: pointer("latest_final")?,
                latest_retired: pointer("latest_retired")?,
            },
        })
    }

    async fn fetch_at_sequence(&self, uid: &Uid, sequence: u64) -> Result<Option<Snapshot<V>>, DomainError> {
        let sql = format!("{} $1 AND v.sequence = $2", SNAPSHOT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(uid.as_str())
            .bind(sequence as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch library item version"))?;

        row.map(|row| row_to_snapshot(uid, &row)).transpose()
    }

    async fn fetch_snapshot(
        &self,
        uid: &Uid,
        filter: &VersionFilter,
    ) -> Result<Option<Snapshot<V>>, DomainError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SNAPSHOT_COLUMNS);
        query.push_bind(uid.as_str());

        if let Some(version) = filter.version {
            query
                .push(" AND v.major = ")
                .push_bind(version.major as i32)
                .push(" AND v.minor = ")
                .push_bind(version.minor as i32);
        } else if let Some(status) = filter.status {
            query.push(" AND v.status = ").push_bind(status.as_str());
        } else if let Some(at) = &filter.at {
            query
                .push(" AND v.start_date <= ")
                .push_bind(*at.as_datetime())
                .push(" AND (v.end_date IS NULL OR v.end_date > ")
                .push_bind(*at.as_datetime())
                .push(")");
        }
        query.push(" ORDER BY v.sequence DESC LIMIT 1");

        let row = query
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch library item version"))?;

        row.map(|row| row_to_snapshot(uid, &row)).transpose()
    }
}

#[async_trait]
impl<V: ValueObject> LibraryItemRepository<V> for PostgresLibraryItemRepository<V> {
    fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    async fn find_by_uid(&self, uid: &Uid, filter: &VersionFilter) -> Result<Snapshot<V>, DomainError> {
        let root = self.live_root(uid).await?;

        let pointer = match (filter.version, filter.status) {
            (Some(_), _) => None,
            (None, Some(status)) => root.pointers.for_status(status),
            (None, None) if filter.is_latest() => root.pointers.latest,
            (None, None) => None,
        };
        let snapshot = match pointer {
            Some(sequence) => self.fetch_at_sequence(uid, sequence).await?,
            None => self.fetch_snapshot(uid, filter).await?,
        };
        snapshot.ok_or_else(|| snapshot_not_found(&self.entity_type, uid, filter))
    }

    async fn find_all(
        &self,
        status: Option<LibraryItemStatus>,
        library_name: Option<&str>,
    ) -> Result<Vec<Snapshot<V>>, DomainError> {
        let pointer = match status {
            None => "latest_sequence",
            Some(LibraryItemStatus::Draft) => "latest_draft",
            Some(LibraryItemStatus::Final) => "latest_final",
            Some(LibraryItemStatus::Retired) => "latest_retired",
        };
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            r#"
            SELECT r.uid, v.snapshot_id, v.sequence, v.status, v.major, v.minor, v.author,
                   v.start_date, v.end_date, v.change_description, val.payload
            FROM library_item_roots r
            JOIN library_item_versions v ON v.uid = r.uid AND v.sequence = r.{}
            JOIN library_item_values val ON val.id = v.value_id
            WHERE r.deleted_at IS NULL AND r.entity_type = "#,
            pointer
        ));
        query.push_bind(self.entity_type.as_str());
        if let Some(name) = library_name {
            query.push(" AND r.library_name = ").push_bind(name);
        }
        query.push(" ORDER BY r.uid");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list library items"))?;

        rows.iter()
            .map(|row| {
                let uid: String = row.try_get("uid").map_err(db_error("decode library item"))?;
                row_to_snapshot(&Uid::new(uid)?, row)
            })
            .collect()
    }

    async fn load_latest(&self, uid: &Uid) -> Result<StoredItem<V>, DomainError> {
        let root = self.live_root(uid).await?;
        let snapshot = match root.pointers.latest {
            Some(sequence) => self.fetch_at_sequence(uid, sequence).await?,
            None => None,
        }
        .ok_or_else(|| item_not_found(&self.entity_type, uid))?;
        Ok(StoredItem {
            library_name: root.library_name,
            snapshot,
        })
    }

    async fn save(&self, item: &VersionedItem<V>) -> Result<SaveReceipt, DomainError> {
        let pending = item.pending().ok_or_else(|| nothing_to_save(item.uid()))?;
        let uid = item.require_uid()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        let before = match item.base_sequence() {
            None => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO library_item_roots (uid, entity_type, library_name)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (uid) DO NOTHING
                    "#,
                )
                .bind(uid.as_str())
                .bind(self.entity_type.as_str())
                .bind(&item.library().name)
                .execute(&mut *tx)
                .await
                .map_err(db_error("insert library item"))?;

                if inserted.rows_affected() == 0 {
                    return Err(uid_taken(&self.entity_type, uid));
                }
                None
            }
            Some(base) => {
                let row = sqlx::query(
                    r#"
                    SELECT latest_sequence FROM library_item_roots
                    WHERE uid = $1 AND entity_type = $2 AND deleted_at IS NULL
                    FOR UPDATE
                    "#,
                )
                .bind(uid.as_str())
                .bind(self.entity_type.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("lock library item"))?
                .ok_or_else(|| item_not_found(&self.entity_type, uid))?;

                let latest: Option<i64> = row
                    .try_get("latest_sequence")
                    .map_err(db_error("decode library item"))?;
                let latest = latest.map(|s| s as u64);
                if latest != Some(base) {
                    return Err(stale_base(&self.entity_type, uid, base, latest));
                }
                Some(fetch_reference(&mut tx, uid, base).await?)
            }
        };

        let (after, value_reused) = match pending.deletion {
            None => {
                let sequence = item.base_sequence().unwrap_or(0) + 1;
                let (value_id, value_reused) = upsert_value(&mut tx, uid, item.value()).await?;
                close_open_version(&mut tx, uid, item.metadata().start_date).await?;
                let snapshot = insert_version(&mut tx, uid, sequence, value_id, item.metadata()).await?;
                move_pointers(&mut tx, uid, sequence, item.metadata().status).await?;
                (Some(snapshot), value_reused)
            }
            Some(Deletion::Tombstone) => {
                close_open_version(&mut tx, uid, pending.at).await?;
                sqlx::query("UPDATE library_item_roots SET deleted_at = $2 WHERE uid = $1")
                    .bind(uid.as_str())
                    .bind(pending.at.as_datetime())
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("tombstone library item"))?;
                (None, false)
            }
            Some(Deletion::Purge) => {
                sqlx::query("DELETE FROM library_item_roots WHERE uid = $1")
                    .bind(uid.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("delete library item"))?;
                (None, false)
            }
        };

        match item.pending_edge_change() {
            Some(EdgeChange::Register(dependency)) => insert_dependency(&mut *tx, &dependency).await?,
            Some(EdgeChange::Release(dependent_uid)) => {
                delete_incoming_edges(&mut *tx, &dependent_uid).await?
            }
            None => {}
        }

        let entry = AuditEntry::new(
            uid.clone(),
            self.entity_type.clone(),
            pending.action,
            pending.author.clone(),
            pending.at,
        )
        .with_scope(item.value().parent_scope().cloned())
        .with_before(before)
        .with_after(after.clone());
        let audit_entry_id = entry.id;
        insert_audit_entry(&mut *tx, &entry).await?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        Ok(SaveReceipt {
            snapshot: after,
            value_reused,
            audit_entry_id,
        })
    }

    async fn version_history(&self, uid: &Uid) -> Result<Vec<Snapshot<V>>, DomainError> {
        self.live_root(uid).await?;

        let sql = format!("{} $1 ORDER BY v.sequence DESC", SNAPSHOT_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(uid.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("fetch version history"))?;

        rows.iter().map(|row| row_to_snapshot(uid, row)).collect()
    }

    async fn exists(&self, uid: &Uid) -> Result<bool, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM library_item_roots
                WHERE uid = $1 AND entity_type = $2 AND deleted_at IS NULL
            ) AS present
            "#,
        )
        .bind(uid.as_str())
        .bind(self.entity_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check library item existence"))?;

        row.try_get("present").map_err(db_error("decode existence check"))
    }
}

/// Hex-encoded SHA-256 of the value's JSON form.
pub(crate) fn content_hash<V: ValueObject>(value: &V) -> Result<(String, serde_json::Value), DomainError> {
    let payload = serde_json::to_value(value)
        .map_err(|e| DomainError::storage(format!("Failed to serialize value: {}", e)))?;
    let bytes = serde_json::to_vec(&payload)
        .map_err(|e| DomainError::storage(format!("Failed to serialize value: {}", e)))?;
    let digest = Sha256::digest(&bytes);
    let hash = digest.iter().map(|b| format!("{:02x}", b)).collect();
    Ok((hash, payload))
}

async fn upsert_value<V: ValueObject>(
    tx: &mut Transaction<'static, Postgres>,
    uid: &Uid,
    value: &V,
) -> Result<(Uuid, bool), DomainError> {
    let (hash, payload) = content_hash(value)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO library_item_values (id, uid, content_hash, payload)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (uid, content_hash) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(ValueId::new().as_uuid())
    .bind(uid.as_str())
    .bind(&hash)
    .bind(&payload)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("insert value"))?;

    if let Some(row) = inserted {
        let id: Uuid = row.try_get("id").map_err(db_error("decode value id"))?;
        return Ok((id, false));
    }

    let row = sqlx::query("SELECT id FROM library_item_values WHERE uid = $1 AND content_hash = $2")
        .bind(uid.as_str())
        .bind(&hash)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("fetch existing value"))?;
    let id: Uuid = row.try_get("id").map_err(db_error("decode value id"))?;
    Ok((id, true))
}

async fn close_open_version(
    tx: &mut Transaction<'static, Postgres>,
    uid: &Uid,
    end: Timestamp,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE library_item_versions
        SET end_date = GREATEST($2, start_date)
        WHERE uid = $1 AND end_date IS NULL
        "#,
    )
    .bind(uid.as_str())
    .bind(end.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("close open version"))?;
    Ok(())
}

async fn insert_version(
    tx: &mut Transaction<'static, Postgres>,
    uid: &Uid,
    sequence: u64,
    value_id: Uuid,
    metadata: &VersionMetadata,
) -> Result<SnapshotRef, DomainError> {
    let snapshot_id = SnapshotId::new();
    sqlx::query(
        r#"
        INSERT INTO library_item_versions (
            snapshot_id, uid, sequence, value_id, status, major, minor,
            author, start_date, end_date, change_description
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10)
        "#,
    )
    .bind(snapshot_id.as_uuid())
    .bind(uid.as_str())
    .bind(sequence as i64)
    .bind(value_id)
    .bind(metadata.status.as_str())
    .bind(metadata.number.major as i32)
    .bind(metadata.number.minor as i32)
    .bind(metadata.author.as_str())
    .bind(metadata.start_date.as_datetime())
    .bind(&metadata.change_description)
    .execute(&mut **tx)
    .await
    .map_err(db_error("insert version"))?;

    Ok(SnapshotRef {
        snapshot_id,
        uid: uid.clone(),
        sequence,
        version: metadata.number,
        status: metadata.status,
    })
}

async fn move_pointers(
    tx: &mut Transaction<'static, Postgres>,
    uid: &Uid,
    sequence: u64,
    status: LibraryItemStatus,
) -> Result<(), DomainError> {
    let mut pointers = Pointers::default();
    pointers.advance(sequence, status);
    let column = |p: Option<u64>| p.map(|s| s as i64);

    sqlx::query(
        r#"
        UPDATE library_item_roots SET
            latest_sequence = $2,
            latest_draft = $3,
            latest_final = $4,
            latest_retired = $5
        WHERE uid = $1
        "#,
    )
    .bind(uid.as_str())
    .bind(column(pointers.latest))
    .bind(column(pointers.latest_draft))
    .bind(column(pointers.latest_final))
    .bind(column(pointers.latest_retired))
    .execute(&mut **tx)
    .await
    .map_err(db_error("update pointers"))?;
    Ok(())
}

async fn fetch_reference(
    tx: &mut Transaction<'static, Postgres>,
    uid: &Uid,
    sequence: u64,
) -> Result<SnapshotRef, DomainError> {
    let row = sqlx::query(
        r#"
        SELECT snapshot_id, status, major, minor FROM library_item_versions
        WHERE uid = $1 AND sequence = $2
        "#,
    )
    .bind(uid.as_str())
    .bind(sequence as i64)
    .fetch_one(&mut **tx)
    .await
    .map_err(db_error("fetch current version"))?;

    let snapshot_id: Uuid = row.try_get("snapshot_id").map_err(db_error("decode version"))?;
    let status: String = row.try_get("status").map_err(db_error("decode version"))?;
    Ok(SnapshotRef {
        snapshot_id: SnapshotId::from_uuid(snapshot_id),
        uid: uid.clone(),
        sequence,
        version: decode_number(&row)?,
        status: status.parse::<LibraryItemStatus>()?,
    })
}

fn decode_number(row: &PgRow) -> Result<VersionNumber, DomainError> {
    let major: i32 = row.try_get("major").map_err(db_error("decode version number"))?;
    let minor: i32 = row.try_get("minor").map_err(db_error("decode version number"))?;
    let to_u32 = |n: i32| {
        u32::try_from(n).map_err(|_| DomainError::storage(format!("Negative version part: {}", n)))
    };
    Ok(VersionNumber::new(to_u32(major)?, to_u32(minor)?))
}

fn row_to_snapshot<V: ValueObject>(uid: &Uid, row: &PgRow) -> Result<Snapshot<V>, DomainError> {
    let decode = db_error("decode version");
    let snapshot_id: Uuid = row.try_get("snapshot_id").map_err(&decode)?;
    let sequence: i64 = row.try_get("sequence").map_err(&decode)?;
    let status: String = row.try_get("status").map_err(&decode)?;
    let author: String = row.try_get("author").map_err(&decode)?;
    let start_date: chrono::DateTime<chrono::Utc> = row.try_get("start_date").map_err(&decode)?;
    let end_date: Option<chrono::DateTime<chrono::Utc>> = row.try_get("end_date").map_err(&decode)?;
    let change_description: String = row.try_get("change_description").map_err(&decode)?;
    let payload: serde_json::Value = row.try_get("payload").map_err(&decode)?;

    let value: V = serde_json::from_value(payload)
        .map_err(|e| DomainError::storage(format!("Failed to deserialize value of {}: {}", uid, e)))?;

    Ok(Snapshot {
        snapshot_id: SnapshotId::from_uuid(snapshot_id),
        uid: uid.clone(),
        sequence: sequence as u64,
        metadata: VersionMetadata::restore(
            status.parse::<LibraryItemStatus>()?,
            decode_number(row)?,
            AuthorId::new(author)?,
            Timestamp::from_datetime(start_date),
            end_date.map(Timestamp::from_datetime),
            change_description,
        ),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::library_items::CompoundValue;

    #[test]
    fn content_hash_is_stable_for_equal_values() {
        let (a, _) = content_hash(&CompoundValue::new("Aspirin")).unwrap();
        let (b, _) = content_hash(&CompoundValue::new("Aspirin")).unwrap();
        let (c, _) = content_hash(&CompoundValue::new("Ibuprofen")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
