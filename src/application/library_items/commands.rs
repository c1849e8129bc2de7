//! Commands accepted by `LibraryItemService`.
//!
//! `expected_version` is the version the caller last read. When set, the
//! service rejects the command with `Conflict` if the item has moved on.

use crate::domain::foundation::Uid;
use crate::domain::versioning::{SnapshotRef, ValueObject, VersionNumber, VersionedItem};
use crate::ports::SaveReceipt;

/// Command to create a new item in a library.
#[derive(Debug, Clone)]
pub struct CreateItem<V> {
    pub library_name: String,
    pub value: V,
}

impl<V> CreateItem<V> {
    pub fn new(library_name: impl Into<String>, value: V) -> Self {
        Self {
            library_name: library_name.into(),
            value,
        }
    }
}

/// Command to replace the value of the current draft.
#[derive(Debug, Clone)]
pub struct EditDraft<V> {
    pub uid: Uid,
    pub value: V,
    pub change_description: String,
    pub expected_version: Option<VersionNumber>,
}

impl<V> EditDraft<V> {
    pub fn new(uid: Uid, value: V, change_description: impl Into<String>) -> Self {
        Self {
            uid,
            value,
            change_description: change_description.into(),
            expected_version: None,
        }
    }

    pub fn expecting(mut self, version: VersionNumber) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Command to open a new draft on top of the current final version.
#[derive(Debug, Clone)]
pub struct CreateNewVersion<V> {
    pub uid: Uid,
    /// Replacement content; the current value is carried over when `None`.
    pub value: Option<V>,
    pub change_description: Option<String>,
    pub expected_version: Option<VersionNumber>,
}

impl<V> CreateNewVersion<V> {
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            value: None,
            change_description: None,
            expected_version: None,
        }
    }

    pub fn with_value(mut self, value: V) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_description(mut self, change_description: impl Into<String>) -> Self {
        self.change_description = Some(change_description.into());
        self
    }

    pub fn expecting(mut self, version: VersionNumber) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Command for the value-less transitions: approve, inactivate, reactivate
/// and both deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTransition {
    pub uid: Uid,
    pub expected_version: Option<VersionNumber>,
}

impl ItemTransition {
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            expected_version: None,
        }
    }

    pub fn expecting(mut self, version: VersionNumber) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Result of a lifecycle command.
#[derive(Debug, Clone)]
pub struct LifecycleResult<V: ValueObject> {
    /// The aggregate after the command, without a pending change.
    pub item: VersionedItem<V>,
    /// `None` when the command was a no-op.
    pub receipt: Option<SaveReceipt>,
}

impl<V: ValueObject> LifecycleResult<V> {
    /// The snapshot the command appended, if any.
    pub fn snapshot(&self) -> Option<&SnapshotRef> {
        self.receipt.as_ref().and_then(|r| r.snapshot.as_ref())
    }

    /// Returns true if the command stored nothing.
    pub fn is_noop(&self) -> bool {
        self.receipt.is_none()
    }
}
