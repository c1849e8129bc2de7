//! Versioned library item aggregate.
//!
//! `VersionedItem` wraps one value object with its lifecycle state. Every
//! operation validates preconditions and produces the next in-memory
//! snapshot only; the repository makes it durable. An aggregate holds at
//! most one unsaved transition.

use super::{
    Library, LibraryItemStatus, ObjectAction, Rederivable, Snapshot, ExistenceChecks,
    ValueObject, VersionMetadata,
};
use crate::domain::audit::AuditAction;
use crate::domain::cascade::{Dependency, EdgeChange};
use crate::domain::foundation::{AuthorId, DomainError, EntityType, Timestamp, Uid};

/// How a pending delete is carried out by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// Remove the item together with its whole history.
    Purge,
    /// Close the open snapshot and hide the item, keeping history.
    Tombstone,
}

/// The unsaved transition of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub action: AuditAction,
    pub author: AuthorId,
    pub at: Timestamp,
    pub deletion: Option<Deletion>,
}

/// Result of an edit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A new draft snapshot is pending.
    Changed,
    /// The proposed value equals the current one; nothing to save.
    Unchanged,
}

/// A library item with its current version.
#[derive(Debug, Clone)]
pub struct VersionedItem<V: ValueObject> {
    uid: Option<Uid>,
    entity_type: EntityType,
    library: Library,
    metadata: VersionMetadata,
    value: V,
    base_sequence: Option<u64>,
    pending: Option<PendingChange>,
}

impl<V: ValueObject> VersionedItem<V> {
    /// Creates a new item as DRAFT 0.1.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if the library is not editable
    /// - `ValidationFailed` if the value is invalid
    pub fn create(
        entity_type: EntityType,
        library: Library,
        value: V,
        checks: &dyn ExistenceChecks,
        author: AuthorId,
    ) -> Result<Self, DomainError> {
        library.ensure_editable()?;
        value.validate(checks)?;

        let at = Timestamp::now();
        Ok(Self {
            uid: None,
            entity_type,
            library,
            metadata: VersionMetadata::initial(author.clone(), at),
            value,
            base_sequence: None,
            pending: Some(PendingChange {
                action: AuditAction::Create,
                author,
                at,
                deletion: None,
            }),
        })
    }

    /// Reconstitutes an aggregate from its latest stored snapshot.
    pub fn from_snapshot(entity_type: EntityType, library: Library, snapshot: Snapshot<V>) -> Self {
        Self {
            uid: Some(snapshot.uid),
            entity_type,
            library,
            metadata: snapshot.metadata,
            value: snapshot.value,
            base_sequence: Some(snapshot.sequence),
            pending: None,
        }
    }

    /// Assigns the permanent uid. Allowed exactly once.
    pub fn assign_uid(&mut self, uid: Uid) -> Result<(), DomainError> {
        if let Some(existing) = &self.uid {
            return Err(DomainError::invalid_transition(format!(
                "Uid already assigned: {}",
                existing
            ))
            .with_detail("uid", existing.to_string()));
        }
        self.uid = Some(uid);
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn uid(&self) -> Option<&Uid> {
        self.uid.as_ref()
    }

    /// Returns the uid, failing if it was never assigned.
    pub fn require_uid(&self) -> Result<&Uid, DomainError> {
        self.uid
            .as_ref()
            .ok_or_else(|| DomainError::validation("uid", "Uid has not been assigned"))
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn metadata(&self) -> &VersionMetadata {
        &self.metadata
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn status(&self) -> LibraryItemStatus {
        self.metadata.status
    }

    /// Sequence of the stored snapshot this aggregate was loaded from.
    pub fn base_sequence(&self) -> Option<u64> {
        self.base_sequence
    }

    pub fn pending(&self) -> Option<&PendingChange> {
        self.pending.as_ref()
    }

    pub fn has_pending_change(&self) -> bool {
        self.pending.is_some()
    }

    /// Edge change the repository applies with the pending transition:
    /// a created item with a parent scope registers under it, a deleted
    /// item releases its edges.
    pub fn pending_edge_change(&self) -> Option<EdgeChange> {
        let pending = self.pending.as_ref()?;
        let uid = self.uid.as_ref()?;
        if pending.deletion.is_some() {
            return Some(EdgeChange::Release(uid.clone()));
        }
        if self.base_sequence.is_some() {
            return None;
        }
        self.value.parent_scope().map(|source_uid| {
            EdgeChange::Register(Dependency::new(
                source_uid.clone(),
                uid.clone(),
                self.entity_type.clone(),
            ))
        })
    }

    /// Actions available on the current version, before reference checks.
    pub fn possible_actions(&self) -> Vec<ObjectAction> {
        self.metadata.possible_actions()
    }

    // ───────────────────────────────────────────────────────────────
    // Lifecycle operations
    // ───────────────────────────────────────────────────────────────

    /// Replaces the value of the current DRAFT, incrementing the minor number.
    ///
    /// Returns `Unchanged` without touching state when the value is equal
    /// to the current one.
    pub fn edit_draft(
        &mut self,
        value: V,
        change_description: impl Into<String>,
        checks: &dyn ExistenceChecks,
        author: AuthorId,
    ) -> Result<EditOutcome, DomainError> {
        self.ensure_mutable()?;
        self.metadata
            .require_status(LibraryItemStatus::Draft, "Edit")?;

        if value == self.value {
            return Ok(EditOutcome::Unchanged);
        }

        let change_description = change_description.into();
        if change_description.trim().is_empty() {
            return Err(DomainError::validation(
                "change_description",
                "Change description is required for edits",
            ));
        }

        value.validate(checks)?;
        value.validate_edit(&self.value, &self.metadata)?;

        let at = Timestamp::now();
        let metadata = self.metadata.edited(author.clone(), at, change_description)?;
        self.apply(metadata, value, AuditAction::Edit, author);
        Ok(EditOutcome::Changed)
    }

    /// Approves the current DRAFT as the next major FINAL version.
    pub fn approve(&mut self, author: AuthorId) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        let metadata = self.metadata.approved(author.clone(), Timestamp::now())?;
        let value = self.value.clone();
        self.apply(metadata, value, AuditAction::Approve, author);
        Ok(())
    }

    /// Opens a new DRAFT on top of the current FINAL, optionally with new content.
    pub fn create_new_version(
        &mut self,
        value: Option<V>,
        change_description: Option<String>,
        checks: &dyn ExistenceChecks,
        author: AuthorId,
    ) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        let metadata = self
            .metadata
            .new_draft(author.clone(), Timestamp::now(), change_description)?;

        let value = match value {
            Some(value) if value != self.value => {
                value.validate(checks)?;
                value.validate_edit(&self.value, &self.metadata)?;
                value
            }
            _ => self.value.clone(),
        };
        self.apply(metadata, value, AuditAction::NewVersion, author);
        Ok(())
    }

    /// Retires the current FINAL. The version number is unchanged.
    pub fn inactivate(&mut self, author: AuthorId) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        let metadata = self.metadata.inactivated(author.clone(), Timestamp::now())?;
        let value = self.value.clone();
        self.apply(metadata, value, AuditAction::Inactivate, author);
        Ok(())
    }

    /// Returns the current RETIRED to FINAL. The version number is unchanged.
    pub fn reactivate(&mut self, author: AuthorId) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        let metadata = self.metadata.reactivated(author.clone(), Timestamp::now())?;
        let value = self.value.clone();
        self.apply(metadata, value, AuditAction::Reactivate, author);
        Ok(())
    }

    /// Marks a never-approved DRAFT for removal together with its history.
    ///
    /// Reference checks are the caller's responsibility.
    pub fn delete_draft(&mut self, author: AuthorId) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.metadata
            .require_status(LibraryItemStatus::Draft, "Delete")?;
        if !self.metadata.number.is_pre_release() {
            return Err(DomainError::invalid_transition(format!(
                "Only never-approved drafts can be deleted, version {} has been approved before",
                self.metadata.number
            ))
            .with_detail("status", self.metadata.status.as_str())
            .with_detail("version", self.metadata.version()));
        }
        self.mark_deleted(author, Deletion::Purge);
        Ok(())
    }

    /// Marks a RETIRED item for tombstoning. History is kept.
    ///
    /// Reference checks are the caller's responsibility.
    pub fn delete_retired(&mut self, author: AuthorId) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.metadata
            .require_status(LibraryItemStatus::Retired, "Delete")?;
        self.mark_deleted(author, Deletion::Tombstone);
        Ok(())
    }

    /// Trusted transition applied when the item's source was approved.
    ///
    /// Skips library and business validation, keeps the status and steps
    /// the version number once.
    pub fn cascade_update(
        &mut self,
        value: V,
        source_uid: &Uid,
        author: AuthorId,
    ) -> Result<(), DomainError> {
        self.ensure_no_pending()?;
        let metadata = self
            .metadata
            .cascaded(author.clone(), Timestamp::now(), source_uid);
        self.apply(metadata, value, AuditAction::CascadeUpdate, author);
        Ok(())
    }

    /// Records that the pending change has been stored as `sequence`.
    pub fn mark_persisted(&mut self, sequence: u64) {
        self.base_sequence = Some(sequence);
        self.pending = None;
    }

    fn ensure_mutable(&self) -> Result<(), DomainError> {
        self.ensure_no_pending()?;
        self.library.ensure_editable()
    }

    fn ensure_no_pending(&self) -> Result<(), DomainError> {
        match &self.pending {
            None => Ok(()),
            Some(pending) => {
                let mut err = DomainError::invalid_transition(format!(
                    "Item has an unsaved {} change",
                    pending.action
                ));
                if let Some(uid) = &self.uid {
                    err = err.with_detail("uid", uid.to_string());
                }
                Err(err)
            }
        }
    }

    fn apply(
        &mut self,
        metadata: VersionMetadata,
        value: V,
        action: AuditAction,
        author: AuthorId,
    ) {
        let at = metadata.start_date;
        self.metadata = metadata;
        self.value = value;
        self.pending = Some(PendingChange {
            action,
            author,
            at,
            deletion: None,
        });
    }

    fn mark_deleted(&mut self, author: AuthorId, deletion: Deletion) {
        self.pending = Some(PendingChange {
            action: AuditAction::Delete,
            author,
            at: Timestamp::now_not_before(&self.metadata.start_date),
            deletion: Some(deletion),
        });
    }
}

impl<V: Rederivable> VersionedItem<V> {
    /// Re-derives the value from new source content and applies the trusted
    /// cascade transition.
    pub fn rederive_from(
        &mut self,
        source_uid: &Uid,
        source_content: &str,
        author: AuthorId,
    ) -> Result<(), DomainError> {
        let value = self.value.rederive(source_uid, source_content)?;
        self.cascade_update(value, source_uid, author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, ValidationError};
    use crate::domain::versioning::NoExistenceChecks;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Term {
        name: String,
    }

    impl ValueObject for Term {
        fn name(&self) -> &str {
            &self.name
        }

        fn validate(&self, _checks: &dyn ExistenceChecks) -> Result<(), ValidationError> {
            if self.name.is_empty() {
                return Err(ValidationError::empty_field("name"));
            }
            Ok(())
        }
    }

    fn term(name: &str) -> Term {
        Term {
            name: name.to_string(),
        }
    }

    fn author() -> AuthorId {
        AuthorId::new("JD").unwrap()
    }

    fn new_item() -> VersionedItem<Term> {
        let mut item = VersionedItem::create(
            EntityType::new("Term").unwrap(),
            Library::editable("Sponsor"),
            term("aspirin"),
            &NoExistenceChecks,
            author(),
        )
        .unwrap();
        item.assign_uid(Uid::new("Term_000001").unwrap()).unwrap();
        item.mark_persisted(1);
        item
    }

    #[test]
    fn create_starts_as_draft_zero_one_with_pending_create() {
        let item = VersionedItem::create(
            EntityType::new("Term").unwrap(),
            Library::editable("Sponsor"),
            term("aspirin"),
            &NoExistenceChecks,
            author(),
        )
        .unwrap();

        assert_eq!(item.status(), LibraryItemStatus::Draft);
        assert_eq!(item.metadata().version(), "0.1");
        assert_eq!(item.pending().map(|p| p.action), Some(AuditAction::Create));
        assert!(item.uid().is_none());
    }

    #[test]
    fn create_fails_in_read_only_library() {
        let result = VersionedItem::create(
            EntityType::new("Term").unwrap(),
            Library::read_only("CDISC"),
            term("aspirin"),
            &NoExistenceChecks,
            author(),
        );
        assert!(result.unwrap_err().is(ErrorCode::InvalidTransition));
    }

    #[test]
    fn create_fails_for_invalid_value() {
        let result = VersionedItem::create(
            EntityType::new("Term").unwrap(),
            Library::editable("Sponsor"),
            term(""),
            &NoExistenceChecks,
            author(),
        );
        let err = result.unwrap_err();
        assert!(err.is(ErrorCode::ValidationFailed));
        assert_eq!(err.detail("field"), Some("name"));
    }

    #[test]
    fn assign_uid_twice_fails() {
        let mut item = new_item();
        let err = item.assign_uid(Uid::new("Term_000002").unwrap()).unwrap_err();
        assert!(err.is(ErrorCode::InvalidTransition));
    }

    #[test]
    fn edit_with_equal_value_is_unchanged() {
        let mut item = new_item();
        let outcome = item
            .edit_draft(term("aspirin"), "nothing", &NoExistenceChecks, author())
            .unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
        assert!(!item.has_pending_change());
        assert_eq!(item.metadata().version(), "0.1");
    }

    #[test]
    fn edit_requires_change_description() {
        let mut item = new_item();
        let err = item
            .edit_draft(term("ibuprofen"), " ", &NoExistenceChecks, author())
            .unwrap_err();
        assert_eq!(err.detail("field"), Some("change_description"));
    }

    #[test]
    fn second_transition_before_save_is_rejected() {
        let mut item = new_item();
        item.approve(author()).unwrap();
        let err = item
            .create_new_version(None, None, &NoExistenceChecks, author())
            .unwrap_err();
        assert!(err.is(ErrorCode::InvalidTransition));
    }

    #[test]
    fn delete_draft_only_before_first_approval() {
        let mut item = new_item();
        item.approve(author()).unwrap();
        item.mark_persisted(2);
        item.create_new_version(None, None, &NoExistenceChecks, author())
            .unwrap();
        item.mark_persisted(3);

        let err = item.delete_draft(author()).unwrap_err();
        assert!(err.is(ErrorCode::InvalidTransition));
        assert_eq!(err.detail("version"), Some("1.1"));
    }

    #[test]
    fn delete_draft_marks_purge() {
        let mut item = new_item();
        item.delete_draft(author()).unwrap();
        let pending = item.pending().unwrap();
        assert_eq!(pending.action, AuditAction::Delete);
        assert_eq!(pending.deletion, Some(Deletion::Purge));
    }

    #[test]
    fn delete_releases_dependency_edges() {
        let mut item = new_item();
        assert_eq!(item.pending_edge_change(), None);

        item.delete_draft(author()).unwrap();
        assert_eq!(
            item.pending_edge_change(),
            Some(EdgeChange::Release(Uid::new("Term_000001").unwrap()))
        );
    }

    #[test]
    fn unscoped_create_registers_nothing() {
        let mut item = VersionedItem::create(
            EntityType::new("Term").unwrap(),
            Library::editable("Sponsor"),
            term("aspirin"),
            &NoExistenceChecks,
            author(),
        )
        .unwrap();
        item.assign_uid(Uid::new("Term_000002").unwrap()).unwrap();
        assert_eq!(item.pending_edge_change(), None);
    }

    #[test]
    fn delete_retired_marks_tombstone() {
        let mut item = new_item();
        item.approve(author()).unwrap();
        item.mark_persisted(2);
        item.inactivate(author()).unwrap();
        item.mark_persisted(3);
        item.delete_retired(author()).unwrap();
        assert_eq!(item.pending().unwrap().deletion, Some(Deletion::Tombstone));
    }

    #[test]
    fn cascade_update_ignores_read_only_library_and_keeps_status() {
        let snapshot = {
            let item = new_item();
            Snapshot {
                snapshot_id: crate::domain::foundation::SnapshotId::new(),
                uid: item.uid().unwrap().clone(),
                sequence: 1,
                metadata: item.metadata().clone(),
                value: item.value().clone(),
            }
        };
        let mut item = VersionedItem::from_snapshot(
            EntityType::new("Term").unwrap(),
            Library::read_only("CDISC"),
            snapshot,
        );
        let source = Uid::new("Template_000001").unwrap();
        item.cascade_update(term("aspirin 100mg"), &source, author())
            .unwrap();

        assert_eq!(item.status(), LibraryItemStatus::Draft);
        assert_eq!(item.metadata().version(), "0.2");
        assert_eq!(item.pending().unwrap().action, AuditAction::CascadeUpdate);
    }

    #[test]
    fn mark_persisted_clears_pending_and_moves_base() {
        let mut item = new_item();
        item.approve(author()).unwrap();
        item.mark_persisted(2);
        assert!(!item.has_pending_change());
        assert_eq!(item.base_sequence(), Some(2));
    }
}
