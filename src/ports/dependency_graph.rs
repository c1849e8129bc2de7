//! Dependency graph port.

use crate::domain::cascade::Dependency;
use crate::domain::foundation::{DomainError, Uid};
use async_trait::async_trait;

/// Source-to-dependent relation used for cascades and reference checks.
#[async_trait]
pub trait DependencyGraph: Send + Sync {
    /// Adds an edge. Adding an existing edge is a no-op.
    async fn add(&self, dependency: Dependency) -> Result<(), DomainError>;

    /// Direct dependents of `source_uid`, in insertion order.
    async fn dependents_of(&self, source_uid: &Uid) -> Result<Vec<Dependency>, DomainError>;

    /// Returns true if any item depends on `uid`.
    async fn is_referenced(&self, uid: &Uid) -> Result<bool, DomainError> {
        Ok(!self.dependents_of(uid).await?.is_empty())
    }

    /// Removes every edge in which `dependent_uid` is the dependent.
    async fn remove_dependent(&self, dependent_uid: &Uid) -> Result<(), DomainError>;
}
