//! In-memory scope lock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::{DomainError, Uid};
use crate::ports::{ScopeGuard, ScopeLock};

type Scopes = Arc<SyncMutex<HashMap<Uid, Arc<Mutex<()>>>>>;

/// One async mutex per scope uid, with a bounded wait.
///
/// A scope's mutex is dropped from the map when its last holder releases
/// it with nobody else waiting.
#[derive(Debug, Clone)]
pub struct InMemoryScopeLock {
    scopes: Scopes,
    timeout: Duration,
}

impl InMemoryScopeLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            scopes: Arc::new(SyncMutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Number of scopes currently held or waited on.
    pub fn tracked_scopes(&self) -> usize {
        lock_map(&self.scopes).len()
    }
}

fn lock_map(scopes: &Scopes) -> std::sync::MutexGuard<'_, HashMap<Uid, Arc<Mutex<()>>>> {
    scopes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Held scope; releases the mutex and prunes the map entry on drop.
struct HeldScope {
    scopes: Scopes,
    scope_uid: Uid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for HeldScope {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut scopes = lock_map(&self.scopes);
        // Only the map's own handle left: no holder and no waiter.
        if scopes
            .get(&self.scope_uid)
            .map_or(false, |scope| Arc::strong_count(scope) == 1)
        {
            scopes.remove(&self.scope_uid);
        }
    }
}

#[async_trait]
impl ScopeLock for InMemoryScopeLock {
    async fn acquire(&self, scope_uid: &Uid) -> Result<ScopeGuard, DomainError> {
        let scope = lock_map(&self.scopes)
            .entry(scope_uid.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, scope.lock_owned()).await {
            Ok(guard) => {
                tracing::debug!(scope_uid = %scope_uid, "Scope lock acquired");
                Ok(ScopeGuard::new(
                    scope_uid.clone(),
                    HeldScope {
                        scopes: self.scopes.clone(),
                        scope_uid: scope_uid.clone(),
                        guard: Some(guard),
                    },
                ))
            }
            Err(_) => {
                tracing::warn!(
                    scope_uid = %scope_uid,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Timed out waiting for scope lock"
                );
                Err(DomainError::conflict(format!(
                    "Scope {} is locked by another operation",
                    scope_uid
                ))
                .with_detail("uid", scope_uid.to_string()))
            }
        }
    }
}
