//! LibraryItemService - Lifecycle commands and queries for one entity type.
//!
//! Each command loads the aggregate, applies one transition and saves it.
//! Durability and the optimistic sequence check belong to the repository;
//! this layer adds the caller-side `expected_version` check, reference
//! checks for deletes and the item context on every error it returns.

use std::sync::Arc;

use super::cascade::CascadePropagator;
use super::commands::{CreateItem, CreateNewVersion, EditDraft, ItemTransition, LifecycleResult};
use crate::domain::audit::AuditEntry;
use crate::domain::cascade::{CascadeReport, Dependency};
use crate::domain::foundation::{
    AuthorId, CommandMetadata, DomainError, EntityType, ErrorCode, Uid,
};
use crate::domain::versioning::{
    EditOutcome, ExistenceChecks, LibraryItemStatus, ObjectAction, Snapshot, ValueObject,
    VersionFilter, VersionMetadata, VersionNumber, VersionedItem,
};
use crate::ports::{LifecyclePorts, SaveReceipt};

/// Result of `approve_with_cascade`.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome<V: ValueObject> {
    pub result: LifecycleResult<V>,
    /// Empty when no propagator is configured or the value has no derived
    /// content.
    pub cascade: CascadeReport,
}

/// Lifecycle service for items of one entity type.
pub struct LibraryItemService<V: ValueObject> {
    ports: LifecyclePorts<V>,
    checks: Arc<dyn ExistenceChecks>,
    cascade: Option<Arc<CascadePropagator>>,
}

impl<V: ValueObject> LibraryItemService<V> {
    pub fn new(ports: LifecyclePorts<V>, checks: Arc<dyn ExistenceChecks>) -> Self {
        Self {
            ports,
            checks,
            cascade: None,
        }
    }

    /// Builder: Propagate approvals to dependents.
    pub fn with_cascade(mut self, propagator: Arc<CascadePropagator>) -> Self {
        self.cascade = Some(propagator);
        self
    }

    pub fn entity_type(&self) -> &EntityType {
        self.ports.repository.entity_type()
    }

    pub(super) fn ports(&self) -> &LifecyclePorts<V> {
        &self.ports
    }

    // ───────────────────────────────────────────────────────────────
    // Commands
    // ───────────────────────────────────────────────────────────────

    /// Creates a DRAFT 0.1 item with a freshly generated uid.
    ///
    /// Values with a parent scope are saved under that scope's lock; the
    /// repository registers the dependency in the same unit as the item.
    pub async fn create(
        &self,
        cmd: CreateItem<V>,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        let entity_type = self.entity_type().to_string();
        let library = self.ports.libraries.find(&cmd.library_name).await?;
        let mut item = VersionedItem::create(
            self.entity_type().clone(),
            library,
            cmd.value,
            self.checks.as_ref(),
            metadata.author.clone(),
        )
        .map_err(|e| e.or_detail("entity_type", entity_type))?;

        let _guard = match item.value().parent_scope() {
            Some(scope_uid) => Some(self.ports.scope_lock.acquire(scope_uid).await?),
            None => None,
        };

        let uid = self.ports.uids.next_uid(self.entity_type()).await?;
        item.assign_uid(uid.clone())?;
        let current = item.metadata().clone();
        let receipt = self
            .persist(&mut item, metadata)
            .await
            .map_err(|e| self.in_context(e, &uid, &current))?;

        Ok(LifecycleResult {
            item,
            receipt: Some(receipt),
        })
    }

    /// Replaces the value of the current draft. Submitting the current
    /// value is a no-op that stores nothing.
    pub async fn edit_draft(
        &self,
        cmd: EditDraft<V>,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        let mut item = self.load_expecting(&cmd.uid, cmd.expected_version).await?;
        let current = item.metadata().clone();
        let context = |e: DomainError| self.in_context(e, &cmd.uid, &current);

        let outcome = item
            .edit_draft(
                cmd.value,
                cmd.change_description,
                self.checks.as_ref(),
                metadata.author.clone(),
            )
            .map_err(&context)?;

        match outcome {
            EditOutcome::Unchanged => {
                tracing::debug!(
                    uid = %cmd.uid,
                    entity_type = %self.entity_type(),
                    version = %item.metadata().number,
                    "Edit skipped, value unchanged"
                );
                Ok(LifecycleResult {
                    item,
                    receipt: None,
                })
            }
            EditOutcome::Changed => {
                let receipt = self.persist(&mut item, metadata).await.map_err(&context)?;
                Ok(LifecycleResult {
                    item,
                    receipt: Some(receipt),
                })
            }
        }
    }

    /// Approves the current draft. Dependents are not touched; see
    /// [`approve_with_cascade`](Self::approve_with_cascade).
    pub async fn approve(
        &self,
        cmd: ItemTransition,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        self.transition(cmd, metadata, |item, author| item.approve(author))
            .await
    }

    /// Approves the item while holding its scope lock, then re-derives
    /// every dependent from the approved content.
    ///
    /// Cascade failures are reported, never raised: the approval stays
    /// committed.
    pub async fn approve_with_cascade(
        &self,
        cmd: ItemTransition,
        metadata: &CommandMetadata,
    ) -> Result<ApprovalOutcome<V>, DomainError> {
        let uid = cmd.uid.clone();
        let _guard = self.ports.scope_lock.acquire(&uid).await?;

        let result = self.approve(cmd, metadata).await?;

        let cascade = match (&self.cascade, result.item.value().derived_content()) {
            (Some(propagator), Some(content)) => {
                let cascade_metadata = metadata.clone().with_source("cascade");
                propagator
                    .cascade_update(&uid, content, &cascade_metadata)
                    .await
            }
            _ => CascadeReport::default(),
        };

        Ok(ApprovalOutcome { result, cascade })
    }

    /// Opens a new draft on top of the current final version.
    pub async fn create_new_version(
        &self,
        cmd: CreateNewVersion<V>,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        let CreateNewVersion {
            uid,
            value,
            change_description,
            expected_version,
        } = cmd;
        let checks = self.checks.clone();

        self.transition(
            ItemTransition {
                uid,
                expected_version,
            },
            metadata,
            move |item, author| {
                item.create_new_version(value, change_description, checks.as_ref(), author)
            },
        )
        .await
    }

    pub async fn inactivate(
        &self,
        cmd: ItemTransition,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        self.transition(cmd, metadata, |item, author| item.inactivate(author))
            .await
    }

    pub async fn reactivate(
        &self,
        cmd: ItemTransition,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        self.transition(cmd, metadata, |item, author| item.reactivate(author))
            .await
    }

    /// Removes a never-approved, unreferenced draft with its history.
    ///
    /// The item's own edges to its sources go with it, in the same save.
    pub async fn delete_draft(
        &self,
        cmd: ItemTransition,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        self.ensure_unreferenced(&cmd.uid).await?;
        self.transition(cmd, metadata, |item, author| item.delete_draft(author))
            .await
    }

    /// Tombstones an unreferenced retired item. History and audit stay.
    pub async fn delete_retired(
        &self,
        cmd: ItemTransition,
        metadata: &CommandMetadata,
    ) -> Result<LifecycleResult<V>, DomainError> {
        self.ensure_unreferenced(&cmd.uid).await?;
        self.transition(cmd, metadata, |item, author| item.delete_retired(author))
            .await
    }

    /// Registers `dependent_uid` (an item of this service's type) as a
    /// dependent of `source_uid`.
    pub async fn add_dependency(
        &self,
        source_uid: &Uid,
        dependent_uid: &Uid,
    ) -> Result<Dependency, DomainError> {
        if source_uid == dependent_uid {
            return Err(DomainError::validation(
                "dependent_uid",
                "An item cannot depend on itself",
            )
            .with_detail("uid", dependent_uid.to_string()));
        }
        if !self.ports.repository.exists(dependent_uid).await? {
            return Err(DomainError::not_found(format!(
                "{} {} not found",
                self.entity_type(),
                dependent_uid
            ))
            .with_detail("uid", dependent_uid.to_string())
            .with_detail("entity_type", self.entity_type().to_string()));
        }

        let dependency = Dependency::new(
            source_uid.clone(),
            dependent_uid.clone(),
            self.entity_type().clone(),
        );
        self.ports.dependencies.add(dependency.clone()).await?;
        Ok(dependency)
    }

    // ───────────────────────────────────────────────────────────────
    // Queries
    // ───────────────────────────────────────────────────────────────

    /// Actions available on the latest version. `Delete` is withheld while
    /// another item depends on this one.
    pub async fn get_possible_actions(&self, uid: &Uid) -> Result<Vec<ObjectAction>, DomainError> {
        let item = self.load(uid).await?;
        let mut actions = item.possible_actions();
        if actions.contains(&ObjectAction::Delete)
            && self.ports.dependencies.is_referenced(uid).await?
        {
            actions.retain(|action| *action != ObjectAction::Delete);
        }
        Ok(actions)
    }

    pub async fn find_by_uid(&self, uid: &Uid, filter: &VersionFilter) -> Result<Snapshot<V>, DomainError> {
        let snapshot = self.ports.repository.find_by_uid(uid, filter).await?;
        tracing::debug!(
            uid = %uid,
            entity_type = %self.entity_type(),
            filter = %filter.describe(),
            version = %snapshot.metadata.number,
            "Library item resolved"
        );
        Ok(snapshot)
    }

    /// Current snapshot of every live item, ordered by uid.
    ///
    /// With a status, only items whose current version has that status are
    /// listed. Resolved through the status pointers, not by scanning history.
    pub async fn find_all(
        &self,
        status: Option<LibraryItemStatus>,
        library_name: Option<&str>,
    ) -> Result<Vec<Snapshot<V>>, DomainError> {
        self.ports.repository.find_all(status, library_name).await
    }

    /// Every stored snapshot, newest first.
    pub async fn get_version_history(&self, uid: &Uid) -> Result<Vec<Snapshot<V>>, DomainError> {
        self.ports.repository.version_history(uid).await
    }

    pub async fn history_for(&self, uid: &Uid) -> Result<Vec<AuditEntry>, DomainError> {
        self.ports.audit.history_for(uid).await
    }

    pub async fn history_for_scope(&self, scope_uid: &Uid) -> Result<Vec<AuditEntry>, DomainError> {
        self.ports.audit.history_for_scope(scope_uid).await
    }

    // ───────────────────────────────────────────────────────────────
    // Internals shared with cascade and batch
    // ───────────────────────────────────────────────────────────────

    /// Reconstitutes the aggregate from its latest snapshot.
    pub(super) async fn load(&self, uid: &Uid) -> Result<VersionedItem<V>, DomainError> {
        let stored = self.ports.repository.load_latest(uid).await?;
        let library = self.ports.libraries.find(&stored.library_name).await?;
        Ok(VersionedItem::from_snapshot(
            self.entity_type().clone(),
            library,
            stored.snapshot,
        ))
    }

    /// Saves the pending change and clears it from the aggregate.
    pub(super) async fn persist(
        &self,
        item: &mut VersionedItem<V>,
        metadata: &CommandMetadata,
    ) -> Result<SaveReceipt, DomainError> {
        let uid = item.require_uid()?.clone();
        let action = item.pending().map(|p| p.action);

        let receipt = match self.ports.repository.save(item).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if e.is(ErrorCode::Conflict) {
                    tracing::warn!(
                        uid = %uid,
                        entity_type = %self.entity_type(),
                        correlation_id = %metadata.correlation_id(),
                        error = %e,
                        "Concurrent modification rejected"
                    );
                }
                return Err(e);
            }
        };

        let sequence = receipt
            .snapshot
            .as_ref()
            .map(|s| s.sequence)
            .or(item.base_sequence())
            .unwrap_or_default();
        item.mark_persisted(sequence);

        tracing::info!(
            uid = %uid,
            entity_type = %self.entity_type(),
            action = ?action,
            version = %item.metadata().number,
            status = %item.status(),
            value_reused = receipt.value_reused,
            correlation_id = %metadata.correlation_id(),
            source = metadata.source().unwrap_or("api"),
            "Library item saved"
        );
        Ok(receipt)
    }

    async fn transition<F>(
        &self,
        cmd: ItemTransition,
        metadata: &CommandMetadata,
        op: F,
    ) -> Result<LifecycleResult<V>, DomainError>
    where
        F: FnOnce(&mut VersionedItem<V>, AuthorId) -> Result<(), DomainError> + Send,
    {
        let mut item = self.load_expecting(&cmd.uid, cmd.expected_version).await?;
        let current = item.metadata().clone();
        let context = |e: DomainError| self.in_context(e, &cmd.uid, &current);

        op(&mut item, metadata.author.clone()).map_err(&context)?;
        let receipt = self.persist(&mut item, metadata).await.map_err(&context)?;
        Ok(LifecycleResult {
            item,
            receipt: Some(receipt),
        })
    }

    async fn load_expecting(
        &self,
        uid: &Uid,
        expected: Option<VersionNumber>,
    ) -> Result<VersionedItem<V>, DomainError> {
        let item = self.load(uid).await?;
        if let Some(expected) = expected {
            let actual = item.metadata().number;
            if actual != expected {
                return Err(DomainError::conflict(format!(
                    "{} {} is at version {}, expected {}",
                    self.entity_type(),
                    uid,
                    actual,
                    expected
                ))
                .with_detail("uid", uid.to_string())
                .with_detail("entity_type", self.entity_type().to_string())
                .with_detail("status", item.status().as_str())
                .with_detail("version", actual.to_string())
                .with_detail("expected_version", expected.to_string()));
            }
        }
        Ok(item)
    }

    /// Fills in the item context that errors raised below this layer lack.
    /// Details already set by the raiser win.
    fn in_context(&self, err: DomainError, uid: &Uid, current: &VersionMetadata) -> DomainError {
        err.or_detail("uid", uid.to_string())
            .or_detail("entity_type", self.entity_type().to_string())
            .or_detail("status", current.status.as_str())
            .or_detail("version", current.version())
    }

    async fn ensure_unreferenced(&self, uid: &Uid) -> Result<(), DomainError> {
        if self.ports.dependencies.is_referenced(uid).await? {
            return Err(DomainError::invalid_transition(format!(
                "{} {} is referenced by other items and cannot be deleted",
                self.entity_type(),
                uid
            ))
            .with_detail("uid", uid.to_string())
            .with_detail("entity_type", self.entity_type().to_string()));
        }
        Ok(())
    }
}
