//! Scope lock port.
//!
//! Serializes multi-step mutations that touch several aggregates under a
//! common parent (a template and its instances, or a batch approval).

use crate::domain::foundation::{DomainError, Uid};
use async_trait::async_trait;

/// Holds a scope lock until dropped.
pub struct ScopeGuard {
    scope_uid: Uid,
    _held: Box<dyn Send>,
}

impl ScopeGuard {
    /// Wraps whatever keeps the lock held (a mutex guard, a transaction).
    pub fn new(scope_uid: Uid, held: impl Send + 'static) -> Self {
        Self {
            scope_uid,
            _held: Box::new(held),
        }
    }

    pub fn scope_uid(&self) -> &Uid {
        &self.scope_uid
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("scope_uid", &self.scope_uid)
            .finish()
    }
}

#[async_trait]
pub trait ScopeLock: Send + Sync {
    /// Waits for exclusive access to `scope_uid`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the lock could not be acquired in time
    /// - `StorageFailure` on infrastructure failure
    async fn acquire(&self, scope_uid: &Uid) -> Result<ScopeGuard, DomainError>;
}
