//! In-memory audit trail.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::audit::AuditEntry;
use crate::domain::foundation::{DomainError, Uid};
use crate::ports::AuditTrail;

/// Append-only audit log kept in memory.
///
/// Shared with the in-memory repositories, which append inside their save.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditTrail {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Infallible, so repositories can call it after
    /// their own checks have passed.
    pub(crate) async fn append(&self, entry: AuditEntry) {
        self.entries.write().await.push(entry);
    }

    /// Number of recorded entries (useful for tests).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditTrail for InMemoryAuditTrail {
    async fn record(&self, entry: AuditEntry) -> Result<(), DomainError> {
        self.append(entry).await;
        Ok(())
    }

    async fn history_for(&self, uid: &Uid) -> Result<Vec<AuditEntry>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| &e.uid == uid).cloned().collect())
    }

    async fn history_for_scope(&self, scope_uid: &Uid) -> Result<Vec<AuditEntry>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.scope_uid.as_ref() == Some(scope_uid))
            .cloned()
            .collect())
    }
}
