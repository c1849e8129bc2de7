//! Cascade module - Dependency relation and cascade reporting.
//!
//! Dependencies are stored apart from the entities themselves as an
//! adjacency relation from a source (template) to its dependents
//! (instances, or instances of instances).

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, EntityType, Uid};
use crate::domain::versioning::SnapshotRef;

/// A dependent item that is re-derived when its source is approved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub source_uid: Uid,
    pub dependent_uid: Uid,
    pub dependent_type: EntityType,
}

impl Dependency {
    pub fn new(source_uid: Uid, dependent_uid: Uid, dependent_type: EntityType) -> Self {
        Self {
            source_uid,
            dependent_uid,
            dependent_type,
        }
    }
}

/// Dependency edges a save adds or drops along with the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeChange {
    /// A new item joins the scope of its source.
    Register(Dependency),
    /// A deleted item leaves every scope it belonged to.
    Release(Uid),
}

/// A dependent that was updated by a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeStep {
    pub source_uid: Uid,
    pub dependent: SnapshotRef,
    pub entity_type: EntityType,
    /// Distance from the approved item; direct dependents are at depth 1.
    pub depth: usize,
}

/// A dependent (or graph lookup) that could not be updated.
#[derive(Debug, Clone)]
pub struct CascadeFailure {
    pub source_uid: Uid,
    /// `None` when the dependents of `source_uid` could not be listed.
    pub dependent_uid: Option<Uid>,
    pub error: DomainError,
}

/// Outcome of propagating one approval to its dependents.
///
/// The approval itself is already committed; failures here never undo it.
#[derive(Debug, Clone, Default)]
pub struct CascadeReport {
    pub updated: Vec<CascadeStep>,
    pub failures: Vec<CascadeFailure>,
    /// Dependents not visited because the depth bound was reached.
    pub truncated: Vec<Uid>,
}

impl CascadeReport {
    /// Returns true if every dependent was updated.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.truncated.is_empty()
    }

    /// Uids of all updated dependents, in visiting order.
    pub fn updated_uids(&self) -> Vec<&Uid> {
        self.updated.iter().map(|s| &s.dependent.uid).collect()
    }
}
