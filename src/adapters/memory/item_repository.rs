//! In-memory library item repository.
//!
//! Holds one `TemporalIndex` per uid behind a single write lock, so every
//! save is trivially atomic. Dependency edges and the audit entry are
//! written while the lock is held.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{InMemoryAuditTrail, InMemoryDependencyGraph};
use crate::adapters::errors::{item_not_found, nothing_to_save, snapshot_not_found, stale_base, uid_taken};
use crate::domain::audit::AuditEntry;
use crate::domain::cascade::EdgeChange;
use crate::domain::foundation::{DomainError, EntityType, Uid};
use crate::domain::versioning::{
    Deletion, LibraryItemStatus, Snapshot, TemporalIndex, ValueObject, VersionFilter,
    VersionedItem,
};
use crate::ports::{DependencyGraph, LibraryItemRepository, SaveReceipt, StoredItem};

pub struct InMemoryLibraryItemRepository<V: ValueObject> {
    entity_type: EntityType,
    items: Arc<RwLock<HashMap<Uid, TemporalIndex<V>>>>,
    audit: InMemoryAuditTrail,
    dependencies: InMemoryDependencyGraph,
}

impl<V: ValueObject> Clone for InMemoryLibraryItemRepository<V> {
    fn clone(&self) -> Self {
        Self {
            entity_type: self.entity_type.clone(),
            items: self.items.clone(),
            audit: self.audit.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

impl<V: ValueObject> InMemoryLibraryItemRepository<V> {
    /// Creates an empty repository that appends audit entries to `audit`
    /// and keeps its items' edges in `dependencies`.
    pub fn new(
        entity_type: EntityType,
        audit: InMemoryAuditTrail,
        dependencies: InMemoryDependencyGraph,
    ) -> Self {
        Self {
            entity_type,
            items: Arc::new(RwLock::new(HashMap::new())),
            audit,
            dependencies,
        }
    }

    /// Returns a copy of the stored index for `uid`, including deleted ones
    /// (useful for tests).
    pub async fn temporal_index(&self, uid: &Uid) -> Option<TemporalIndex<V>> {
        self.items.read().await.get(uid).cloned()
    }

    async fn live_index<T>(
        &self,
        uid: &Uid,
        read: impl FnOnce(&TemporalIndex<V>) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let items = self.items.read().await;
        match items.get(uid) {
            Some(index) if !index.is_tombstoned() => read(index),
            _ => Err(item_not_found(&self.entity_type, uid)),
        }
    }
}

#[async_trait]
impl<V: ValueObject> LibraryItemRepository<V> for InMemoryLibraryItemRepository<V> {
    fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    async fn find_by_uid(&self, uid: &Uid, filter: &VersionFilter) -> Result<Snapshot<V>, DomainError> {
        self.live_index(uid, |index| {
            index
                .resolve(filter)
                .ok_or_else(|| snapshot_not_found(&self.entity_type, uid, filter))
        })
        .await
    }

    async fn find_all(
        &self,
        status: Option<LibraryItemStatus>,
        library_name: Option<&str>,
    ) -> Result<Vec<Snapshot<V>>, DomainError> {
        let items = self.items.read().await;
        let mut found: Vec<Snapshot<V>> = items
            .values()
            .filter(|index| !index.is_tombstoned())
            .filter(|index| library_name.map_or(true, |name| index.library_name() == name))
            .filter_map(|index| index.current(status))
            .collect();
        found.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(found)
    }

    async fn load_latest(&self, uid: &Uid) -> Result<StoredItem<V>, DomainError> {
        self.live_index(uid, |index| {
            let snapshot = index
                .latest()
                .ok_or_else(|| item_not_found(&self.entity_type, uid))?;
            Ok(StoredItem {
                library_name: index.library_name().to_string(),
                snapshot,
            })
        })
        .await
    }

    async fn save(&self, item: &VersionedItem<V>) -> Result<SaveReceipt, DomainError> {
        let pending = item.pending().ok_or_else(|| nothing_to_save(item.uid()))?;
        let uid = item.require_uid()?.clone();

        let mut items = self.items.write().await;

        let before = match item.base_sequence() {
            None => {
                if items.contains_key(&uid) {
                    return Err(uid_taken(&self.entity_type, &uid));
                }
                None
            }
            Some(base) => {
                let index = items
                    .get(&uid)
                    .filter(|index| !index.is_tombstoned())
                    .ok_or_else(|| item_not_found(&self.entity_type, &uid))?;
                if index.latest_sequence() != Some(base) {
                    return Err(stale_base(&self.entity_type, &uid, base, index.latest_sequence()));
                }
                index.latest().map(|s| s.reference())
            }
        };

        let (after, value_reused) = match pending.deletion {
            None => {
                let index = items.entry(uid.clone()).or_insert_with(|| {
                    TemporalIndex::new(uid.clone(), self.entity_type.clone(), item.library().name.clone())
                });
                let appended = index.append(item.metadata(), item.value());
                (Some(appended.snapshot), appended.value_reused)
            }
            Some(Deletion::Tombstone) => {
                if let Some(index) = items.get_mut(&uid) {
                    index.tombstone(pending.at);
                }
                (None, false)
            }
            Some(Deletion::Purge) => {
                items.remove(&uid);
                (None, false)
            }
        };

        match item.pending_edge_change() {
            Some(EdgeChange::Register(dependency)) => self.dependencies.add(dependency).await?,
            Some(EdgeChange::Release(dependent_uid)) => {
                self.dependencies.remove_dependent(&dependent_uid).await?
            }
            None => {}
        }

        let entry = AuditEntry::new(
            uid,
            self.entity_type.clone(),
            pending.action,
            pending.author.clone(),
            pending.at,
        )
        .with_scope(item.value().parent_scope().cloned())
        .with_before(before)
        .with_after(after.clone());
        let audit_entry_id = entry.id;
        self.audit.append(entry).await;

        Ok(SaveReceipt {
            snapshot: after,
            value_reused,
            audit_entry_id,
        })
    }

    async fn version_history(&self, uid: &Uid) -> Result<Vec<Snapshot<V>>, DomainError> {
        self.live_index(uid, |index| Ok(index.history_newest_first()))
            .await
    }

    async fn exists(&self, uid: &Uid) -> Result<bool, DomainError> {
        let items = self.items.read().await;
        Ok(items.get(uid).map_or(false, |index| !index.is_tombstoned()))
    }
}
