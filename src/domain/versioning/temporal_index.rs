//! Per-item temporal index: ordered history, deduplicated values and the
//! "current" pointers.
//!
//! This is the in-process model of what a repository persists for one uid.
//! The in-memory adapter stores it directly; the PostgreSQL adapter keeps
//! the same shape in relational tables.

use super::{
    LibraryItemStatus, Snapshot, SnapshotRef, ValueObject, VersionFilter, VersionMetadata,
};
use crate::domain::foundation::{EntityType, SnapshotId, Timestamp, Uid, ValueId};

/// Sequence numbers of the current snapshots.
///
/// `latest` always points at the newest entry. Exactly one status pointer,
/// the one matching the newest entry's status, is set; the others are
/// cleared when their status is vacated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pointers {
    pub latest: Option<u64>,
    pub latest_draft: Option<u64>,
    pub latest_final: Option<u64>,
    pub latest_retired: Option<u64>,
}

impl Pointers {
    /// Moves the pointers to a newly appended entry.
    pub fn advance(&mut self, sequence: u64, status: LibraryItemStatus) {
        self.latest = Some(sequence);
        self.latest_draft = None;
        self.latest_final = None;
        self.latest_retired = None;
        *self.for_status_mut(status) = Some(sequence);
    }

    /// Returns the pointer of the given status.
    pub fn for_status(&self, status: LibraryItemStatus) -> Option<u64> {
        match status {
            LibraryItemStatus::Draft => self.latest_draft,
            LibraryItemStatus::Final => self.latest_final,
            LibraryItemStatus::Retired => self.latest_retired,
        }
    }

    fn for_status_mut(&mut self, status: LibraryItemStatus) -> &mut Option<u64> {
        match status {
            LibraryItemStatus::Draft => &mut self.latest_draft,
            LibraryItemStatus::Final => &mut self.latest_final,
            LibraryItemStatus::Retired => &mut self.latest_retired,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    snapshot_id: SnapshotId,
    sequence: u64,
    metadata: VersionMetadata,
    value_id: ValueId,
}

/// Result of appending a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub snapshot: SnapshotRef,
    /// Previous entry that was closed by this append, if any.
    pub closed: Option<SnapshotRef>,
    /// True if the value was already stored and has been reused.
    pub value_reused: bool,
}

/// History and pointers of one library item.
#[derive(Debug, Clone)]
pub struct TemporalIndex<V: ValueObject> {
    uid: Uid,
    entity_type: EntityType,
    library_name: String,
    values: Vec<(ValueId, V)>,
    entries: Vec<IndexEntry>,
    pointers: Pointers,
    tombstoned_at: Option<Timestamp>,
}

impl<V: ValueObject> TemporalIndex<V> {
    /// Creates an empty index for a new uid.
    pub fn new(uid: Uid, entity_type: EntityType, library_name: impl Into<String>) -> Self {
        Self {
            uid,
            entity_type,
            library_name: library_name.into(),
            values: Vec::new(),
            entries: Vec::new(),
            pointers: Pointers::default(),
            tombstoned_at: None,
        }
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    pub fn pointers(&self) -> &Pointers {
        &self.pointers
    }

    /// Sequence of the newest entry; `None` for an empty index.
    pub fn latest_sequence(&self) -> Option<u64> {
        self.pointers.latest
    }

    /// Number of distinct stored values.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned_at.is_some()
    }

    /// Appends a snapshot, closing the currently open one.
    ///
    /// The value is deduplicated against every value stored for this uid.
    pub fn append(&mut self, metadata: &VersionMetadata, value: &V) -> Appended {
        let (value_id, value_reused) = match self.values.iter().find(|(_, v)| v == value) {
            Some((id, _)) => (*id, true),
            None => {
                let id = ValueId::new();
                self.values.push((id, value.clone()));
                (id, false)
            }
        };

        let closed = self.close_open(metadata.start_date);

        let sequence = self.entries.len() as u64 + 1;
        let entry = IndexEntry {
            snapshot_id: SnapshotId::new(),
            sequence,
            metadata: VersionMetadata {
                end_date: None,
                ..metadata.clone()
            },
            value_id,
        };
        let snapshot = self.reference(&entry);
        self.entries.push(entry);
        self.pointers.advance(sequence, metadata.status);

        Appended {
            snapshot,
            closed,
            value_reused,
        }
    }

    /// Closes the open snapshot and hides the item from lookups.
    ///
    /// History is retained for audit purposes.
    pub fn tombstone(&mut self, at: Timestamp) -> Option<SnapshotRef> {
        let closed = self.close_open(at);
        self.tombstoned_at = Some(at);
        closed
    }

    /// Returns the snapshot selected by `filter`, ignoring tombstones.
    ///
    /// Latest and status lookups are served from the pointers. A status
    /// whose pointer is cleared falls back to the newest matching entry.
    pub fn resolve(&self, filter: &VersionFilter) -> Option<Snapshot<V>> {
        if filter.version.is_none() {
            if filter.is_latest() {
                return self.current(None);
            }
            if let Some(snapshot) = filter.status.and_then(|status| self.current(Some(status))) {
                return Some(snapshot);
            }
        }
        let history = self.history();
        filter.select(&history).cloned()
    }

    /// Returns the snapshot a pointer refers to: `latest` for `None`,
    /// otherwise the status pointer, which is set only while the newest
    /// entry has that status.
    pub fn current(&self, status: Option<LibraryItemStatus>) -> Option<Snapshot<V>> {
        let sequence = match status {
            None => self.pointers.latest,
            Some(status) => self.pointers.for_status(status),
        }?;
        let position = usize::try_from(sequence.checked_sub(1)?).ok()?;
        self.entries
            .get(position)
            .and_then(|entry| self.materialize(entry))
    }

    /// Returns the newest snapshot.
    pub fn latest(&self) -> Option<Snapshot<V>> {
        self.current(None)
    }

    /// Returns all snapshots, oldest first.
    pub fn history(&self) -> Vec<Snapshot<V>> {
        self.entries
            .iter()
            .filter_map(|e| self.materialize(e))
            .collect()
    }

    /// Returns all snapshots, newest first.
    pub fn history_newest_first(&self) -> Vec<Snapshot<V>> {
        let mut history = self.history();
        history.reverse();
        history
    }

    fn close_open(&mut self, at: Timestamp) -> Option<SnapshotRef> {
        let open = self.entries.iter_mut().rev().find(|e| e.metadata.is_open())?;
        open.metadata = open.metadata.closed_at(at.max(open.metadata.start_date));
        let open = open.clone();
        Some(self.reference(&open))
    }

    fn reference(&self, entry: &IndexEntry) -> SnapshotRef {
        SnapshotRef {
            snapshot_id: entry.snapshot_id,
            uid: self.uid.clone(),
            sequence: entry.sequence,
            version: entry.metadata.number,
            status: entry.metadata.status,
        }
    }

    fn materialize(&self, entry: &IndexEntry) -> Option<Snapshot<V>> {
        let value = self
            .values
            .iter()
            .find(|(id, _)| *id == entry.value_id)
            .map(|(_, v)| v.clone())?;
        Some(Snapshot {
            snapshot_id: entry.snapshot_id,
            uid: self.uid.clone(),
            sequence: entry.sequence,
            metadata: entry.metadata.clone(),
            value,
        })
    }
}
