//! Library item repository port.
//!
//! Defines the contract for persisting versioned library items together
//! with their temporal index and audit trail.
//!
//! # Consistency contract
//!
//! `save` is one atomic unit: the optimistic sequence check, value
//! deduplication, closing the previous open snapshot, appending the new
//! one, moving the pointers, the item's dependency edges and appending the
//! audit entry either all happen or none do.
//!
//! A newly created item whose value has a parent scope is registered as a
//! dependent of it; a deleted item loses every edge in which it is the
//! dependent.

use crate::domain::foundation::{AuditEntryId, DomainError, EntityType, Uid};
use crate::domain::versioning::{
    LibraryItemStatus, Snapshot, SnapshotRef, ValueObject, VersionFilter, VersionedItem,
};
use async_trait::async_trait;

/// The latest snapshot of an item together with its library name.
#[derive(Debug, Clone)]
pub struct StoredItem<V: ValueObject> {
    pub library_name: String,
    pub snapshot: Snapshot<V>,
}

/// What a successful save produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// The appended snapshot; `None` for deletes.
    pub snapshot: Option<SnapshotRef>,
    /// True if an equal value was already stored for this uid and was reused.
    pub value_reused: bool,
    pub audit_entry_id: AuditEntryId,
}

/// Repository port for one entity type of versioned library items.
#[async_trait]
pub trait LibraryItemRepository<V: ValueObject>: Send + Sync {
    /// The entity type this repository stores.
    fn entity_type(&self) -> &EntityType;

    /// Finds the snapshot selected by `filter`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the uid is unknown or deleted, or nothing matches
    /// - `StorageFailure` on persistence failure
    async fn find_by_uid(&self, uid: &Uid, filter: &VersionFilter) -> Result<Snapshot<V>, DomainError>;

    /// Lists the current snapshot of every live item, ordered by uid.
    ///
    /// `status` keeps items whose status pointer for it is set and returns
    /// the snapshot it points at; `None` returns each item's latest.
    /// `library_name` narrows to one library.
    async fn find_all(
        &self,
        status: Option<LibraryItemStatus>,
        library_name: Option<&str>,
    ) -> Result<Vec<Snapshot<V>>, DomainError>;

    /// Loads the latest snapshot and library name for reconstituting an aggregate.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the uid is unknown or deleted
    async fn load_latest(&self, uid: &Uid) -> Result<StoredItem<V>, DomainError>;

    /// Persists the aggregate's pending change.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if the aggregate has no pending change
    /// - `Conflict` if the stored latest snapshot is not the aggregate's
    ///   base, or a new item's uid is already taken
    /// - `NotFound` if an existing item has disappeared
    /// - `StorageFailure` on persistence failure
    async fn save(&self, item: &VersionedItem<V>) -> Result<SaveReceipt, DomainError>;

    /// Returns all snapshots, newest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the uid is unknown or deleted
    async fn version_history(&self, uid: &Uid) -> Result<Vec<Snapshot<V>>, DomainError>;

    /// Returns true if a live (not deleted) item with this uid exists.
    async fn exists(&self, uid: &Uid) -> Result<bool, DomainError>;
}
