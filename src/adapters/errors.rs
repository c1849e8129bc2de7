//! Error constructors shared by the storage adapters.

use crate::domain::foundation::{DomainError, EntityType, Uid};
use crate::domain::versioning::VersionFilter;

/// The uid is unknown or has been deleted.
pub(crate) fn item_not_found(entity_type: &EntityType, uid: &Uid) -> DomainError {
    DomainError::not_found(format!("{} {} not found", entity_type, uid))
        .with_detail("uid", uid.to_string())
        .with_detail("entity_type", entity_type.to_string())
}

/// The uid exists but no snapshot matches the filter.
pub(crate) fn snapshot_not_found(
    entity_type: &EntityType,
    uid: &Uid,
    filter: &VersionFilter,
) -> DomainError {
    let mut err = DomainError::not_found(format!(
        "{} {} has no snapshot for {}",
        entity_type,
        uid,
        filter.describe()
    ))
    .with_detail("uid", uid.to_string())
    .with_detail("entity_type", entity_type.to_string());
    if let Some(version) = filter.version {
        err = err.with_detail("version", version.to_string());
    }
    if let Some(status) = filter.status {
        err = err.with_detail("status", status.as_str());
    }
    err
}

/// Another writer stored a snapshot after the aggregate was loaded.
pub(crate) fn stale_base(
    entity_type: &EntityType,
    uid: &Uid,
    expected: u64,
    actual: Option<u64>,
) -> DomainError {
    DomainError::conflict(format!(
        "{} {} was modified concurrently (loaded sequence {}, stored sequence {})",
        entity_type,
        uid,
        expected,
        actual.map_or_else(|| "none".to_string(), |s| s.to_string())
    ))
    .with_detail("uid", uid.to_string())
    .with_detail("entity_type", entity_type.to_string())
}

/// A new item was saved under a uid that is already taken.
pub(crate) fn uid_taken(entity_type: &EntityType, uid: &Uid) -> DomainError {
    DomainError::conflict(format!("{} {} already exists", entity_type, uid))
        .with_detail("uid", uid.to_string())
        .with_detail("entity_type", entity_type.to_string())
}

/// The aggregate has nothing to persist.
pub(crate) fn nothing_to_save(uid: Option<&Uid>) -> DomainError {
    let mut err = DomainError::invalid_transition("Item has no pending change to save");
    if let Some(uid) = uid {
        err = err.with_detail("uid", uid.to_string());
    }
    err
}
