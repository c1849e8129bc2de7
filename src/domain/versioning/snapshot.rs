//! Stored snapshots and version lookup filters.

use serde::{Deserialize, Serialize};

use super::{LibraryItemStatus, ValueObject, VersionMetadata, VersionNumber};
use crate::domain::foundation::{SnapshotId, Timestamp, Uid};

/// One immutable (metadata, value) pair in an item's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "V: ValueObject")]
pub struct Snapshot<V: ValueObject> {
    pub snapshot_id: SnapshotId,
    pub uid: Uid,
    /// Position in the item's history, starting at 1.
    pub sequence: u64,
    pub metadata: VersionMetadata,
    pub value: V,
}

impl<V: ValueObject> Snapshot<V> {
    /// Returns a lightweight reference to this snapshot.
    pub fn reference(&self) -> SnapshotRef {
        SnapshotRef {
            snapshot_id: self.snapshot_id,
            uid: self.uid.clone(),
            sequence: self.sequence,
            version: self.metadata.number,
            status: self.metadata.status,
        }
    }

    /// Returns true if this snapshot was current at `at`.
    ///
    /// Validity intervals are half-open: `[start_date, end_date)`.
    pub fn was_current_at(&self, at: &Timestamp) -> bool {
        let started = !self.metadata.start_date.is_after(at);
        let not_ended = match &self.metadata.end_date {
            Some(end) => at.is_before(end),
            None => true,
        };
        started && not_ended
    }
}

/// Reference to a stored snapshot, as carried by audit entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub snapshot_id: SnapshotId,
    pub uid: Uid,
    pub sequence: u64,
    pub version: VersionNumber,
    pub status: LibraryItemStatus,
}

/// Which snapshot of an item a lookup should return.
///
/// Precedence when several criteria are set: version, then status, then
/// point in time. With none set the latest snapshot is returned. Version
/// and status lookups return the most recent matching snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionFilter {
    pub version: Option<VersionNumber>,
    pub status: Option<LibraryItemStatus>,
    pub at: Option<Timestamp>,
}

impl VersionFilter {
    /// Selects the latest snapshot.
    pub fn latest() -> Self {
        Self::default()
    }

    /// Selects the most recent snapshot with the given version number.
    pub fn version(version: VersionNumber) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }

    /// Selects the most recent snapshot with the given status.
    pub fn status(status: LibraryItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Selects the snapshot that was current at the given time.
    pub fn at(at: Timestamp) -> Self {
        Self {
            at: Some(at),
            ..Self::default()
        }
    }

    /// Returns true if no criterion is set.
    pub fn is_latest(&self) -> bool {
        self.version.is_none() && self.status.is_none() && self.at.is_none()
    }

    /// Selects the matching snapshot from a history ordered by ascending sequence.
    pub fn select<'a, V: ValueObject>(&self, history: &'a [Snapshot<V>]) -> Option<&'a Snapshot<V>> {
        let mut newest_first = history.iter().rev();
        if let Some(version) = self.version {
            newest_first.find(|s| s.metadata.number == version)
        } else if let Some(status) = self.status {
            newest_first.find(|s| s.metadata.status == status)
        } else if let Some(at) = &self.at {
            newest_first.find(|s| s.was_current_at(at))
        } else {
            history.last()
        }
    }

    /// Describes the filter for error messages.
    pub fn describe(&self) -> String {
        if let Some(version) = self.version {
            format!("version {}", version)
        } else if let Some(status) = self.status {
            format!("status {}", status)
        } else if let Some(at) = &self.at {
            format!("date {}", at.as_datetime().to_rfc3339())
        } else {
            "latest version".to_string()
        }
    }
}
