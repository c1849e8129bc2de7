//! Audit trail port (read side and out-of-band writes).
//!
//! Repositories append entries for lifecycle operations inside their save
//! unit. `record` is for entries written outside a save.

use crate::domain::audit::AuditEntry;
use crate::domain::foundation::{DomainError, Uid};
use async_trait::async_trait;

#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Appends an entry. Entries are never updated or removed.
    async fn record(&self, entry: AuditEntry) -> Result<(), DomainError>;

    /// Entries for one item, oldest first.
    async fn history_for(&self, uid: &Uid) -> Result<Vec<AuditEntry>, DomainError>;

    /// Entries of all items grouped under a parent scope, oldest first.
    async fn history_for_scope(&self, scope_uid: &Uid) -> Result<Vec<AuditEntry>, DomainError>;
}
