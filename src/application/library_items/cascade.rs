//! Cascade propagation from an approved source to its dependents.
//!
//! Traversal is breadth-first over the dependency graph with a visited set
//! and a depth bound. Each dependent is re-derived from its source's
//! derived content and stored through the trusted cascade transition.
//! Failures are collected per dependent and never undo the approval.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::service::LibraryItemService;
use crate::domain::cascade::{CascadeFailure, CascadeReport, CascadeStep};
use crate::domain::foundation::{CommandMetadata, DomainError, EntityType, Uid};
use crate::domain::versioning::{Rederivable, SnapshotRef};
use crate::ports::DependencyGraph;

/// What a cascade step stored.
#[derive(Debug, Clone)]
pub struct CascadeApplied {
    pub snapshot: SnapshotRef,
    /// Content further dependents re-derive from, if any.
    pub derived_content: Option<String>,
}

/// An entity type that can be updated by a cascade.
#[async_trait]
pub trait CascadeTarget: Send + Sync {
    fn target_type(&self) -> &EntityType;

    /// Re-derives `dependent_uid` from the new content of `source_uid` and
    /// stores the result.
    async fn apply_cascade(
        &self,
        dependent_uid: &Uid,
        source_uid: &Uid,
        source_content: &str,
        metadata: &CommandMetadata,
    ) -> Result<CascadeApplied, DomainError>;
}

#[async_trait]
impl<V: Rederivable> CascadeTarget for LibraryItemService<V> {
    fn target_type(&self) -> &EntityType {
        self.entity_type()
    }

    async fn apply_cascade(
        &self,
        dependent_uid: &Uid,
        source_uid: &Uid,
        source_content: &str,
        metadata: &CommandMetadata,
    ) -> Result<CascadeApplied, DomainError> {
        let mut item = self.load(dependent_uid).await?;
        item.rederive_from(source_uid, source_content, metadata.author.clone())?;
        let receipt = self.persist(&mut item, metadata).await?;

        let snapshot = receipt.snapshot.ok_or_else(|| {
            DomainError::storage(format!("Cascade update of {} stored no snapshot", dependent_uid))
        })?;
        Ok(CascadeApplied {
            snapshot,
            derived_content: item.value().derived_content().map(str::to_string),
        })
    }
}

/// Walks the dependency graph from an approved item.
pub struct CascadePropagator {
    dependencies: Arc<dyn DependencyGraph>,
    targets: HashMap<EntityType, Arc<dyn CascadeTarget>>,
    max_depth: usize,
}

impl CascadePropagator {
    pub fn new(dependencies: Arc<dyn DependencyGraph>, max_depth: usize) -> Self {
        Self {
            dependencies,
            targets: HashMap::new(),
            max_depth,
        }
    }

    /// Builder: Route dependents of the target's entity type to `target`.
    pub fn with_target(mut self, target: Arc<dyn CascadeTarget>) -> Self {
        self.targets.insert(target.target_type().clone(), target);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Propagates the new content of `source_uid` to its dependents.
    pub async fn cascade_update(
        &self,
        source_uid: &Uid,
        source_content: &str,
        metadata: &CommandMetadata,
    ) -> CascadeReport {
        let mut report = CascadeReport::default();
        let mut visited: HashSet<Uid> = HashSet::from([source_uid.clone()]);
        let mut queue = VecDeque::from([(source_uid.clone(), source_content.to_string(), 0usize)]);

        while let Some((uid, content, depth)) = queue.pop_front() {
            let dependents = match self.dependencies.dependents_of(&uid).await {
                Ok(dependents) => dependents,
                Err(error) => {
                    tracing::warn!(source_uid = %uid, error = %error, "Failed to list dependents");
                    report.failures.push(CascadeFailure {
                        source_uid: uid,
                        dependent_uid: None,
                        error,
                    });
                    continue;
                }
            };

            for dependency in dependents {
                if !visited.insert(dependency.dependent_uid.clone()) {
                    continue;
                }
                if depth + 1 > self.max_depth {
                    tracing::debug!(
                        source_uid = %uid,
                        dependent_uid = %dependency.dependent_uid,
                        max_depth = self.max_depth,
                        "Cascade depth reached"
                    );
                    report.truncated.push(dependency.dependent_uid);
                    continue;
                }

                let target = match self.targets.get(&dependency.dependent_type) {
                    Some(target) => target,
                    None => {
                        report.failures.push(CascadeFailure {
                            source_uid: uid.clone(),
                            dependent_uid: Some(dependency.dependent_uid.clone()),
                            error: DomainError::not_found(format!(
                                "No cascade target for {}",
                                dependency.dependent_type
                            ))
                            .with_detail("entity_type", dependency.dependent_type.to_string()),
                        });
                        continue;
                    }
                };

                match target
                    .apply_cascade(&dependency.dependent_uid, &uid, &content, metadata)
                    .await
                {
                    Ok(applied) => {
                        if let Some(next) = applied.derived_content {
                            queue.push_back((dependency.dependent_uid.clone(), next, depth + 1));
                        }
                        report.updated.push(CascadeStep {
                            source_uid: uid.clone(),
                            dependent: applied.snapshot,
                            entity_type: dependency.dependent_type,
                            depth: depth + 1,
                        });
                    }
                    Err(error) => {
                        tracing::warn!(
                            source_uid = %uid,
                            dependent_uid = %dependency.dependent_uid,
                            error = %error,
                            "Cascade update failed"
                        );
                        report.failures.push(CascadeFailure {
                            source_uid: uid.clone(),
                            dependent_uid: Some(dependency.dependent_uid),
                            error,
                        });
                    }
                }
            }
        }

        tracing::info!(
            source_uid = %source_uid,
            updated = report.updated.len(),
            failed = report.failures.len(),
            truncated = report.truncated.len(),
            correlation_id = %metadata.correlation_id(),
            "Cascade finished"
        );
        report
    }
}
