//! Uid generator port.

use crate::domain::foundation::{DomainError, EntityType, Uid};
use async_trait::async_trait;

/// Issues permanent uids, one counter per entity type.
///
/// Increment-and-read must be atomic: gaps are acceptable, duplicates
/// never are.
#[async_trait]
pub trait UidGenerator: Send + Sync {
    /// Returns the next uid for `entity_type`, e.g. `Compound_000042`.
    async fn next_uid(&self, entity_type: &EntityType) -> Result<Uid, DomainError>;
}
