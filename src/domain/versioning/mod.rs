//! Versioning module - The Draft/Final/Retired lifecycle shared by all
//! library items.
//!
//! - `status` - status enum and its state machine
//! - `metadata` - version numbers and per-snapshot metadata
//! - `value` - the value object contract and existence checks
//! - `aggregate` - `VersionedItem`, the lifecycle aggregate
//! - `snapshot` - stored snapshots and lookup filters
//! - `temporal_index` - per-item history with current pointers

mod action;
mod aggregate;
mod library;
mod metadata;
mod snapshot;
mod status;
mod temporal_index;
mod value;

pub use action::ObjectAction;
pub use aggregate::{Deletion, EditOutcome, PendingChange, VersionedItem};
pub use library::Library;
pub use metadata::{
    VersionMetadata, VersionNumber, APPROVED_VERSION_DESCRIPTION, INACTIVATED_VERSION_DESCRIPTION,
    INITIAL_VERSION_DESCRIPTION, NEW_DRAFT_DESCRIPTION, REACTIVATED_VERSION_DESCRIPTION,
};
pub use snapshot::{Snapshot, SnapshotRef, VersionFilter};
pub use status::LibraryItemStatus;
pub use temporal_index::{Appended, Pointers, TemporalIndex};
pub use value::{ExistenceChecks, NoExistenceChecks, Rederivable, ValueObject};
