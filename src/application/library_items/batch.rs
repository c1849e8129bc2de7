//! Batch approval under a single scope lock.

use futures::future::join_all;

use super::commands::{ItemTransition, LifecycleResult};
use super::service::LibraryItemService;
use crate::domain::foundation::{CommandMetadata, DomainError, Uid};
use crate::domain::versioning::ValueObject;

/// Per-item outcome of `approve_many`. Each item is saved on its own;
/// one failure does not undo the others.
#[derive(Debug)]
pub struct BatchApproval<V: ValueObject> {
    pub approved: Vec<LifecycleResult<V>>,
    pub failures: Vec<(Uid, DomainError)>,
}

impl<V: ValueObject> BatchApproval<V> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<V: ValueObject> LibraryItemService<V> {
    /// Approves several items while holding the lock on `scope_uid`, so no
    /// other scoped operation (such as a cascade from the same template)
    /// interleaves with the batch.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the scope lock cannot be acquired in time
    pub async fn approve_many(
        &self,
        scope_uid: &Uid,
        commands: Vec<ItemTransition>,
        metadata: &CommandMetadata,
    ) -> Result<BatchApproval<V>, DomainError> {
        let _guard = self.ports().scope_lock.acquire(scope_uid).await?;

        let outcomes = join_all(commands.into_iter().map(|cmd| async move {
            let uid = cmd.uid.clone();
            (uid, self.approve(cmd, metadata).await)
        }))
        .await;

        let mut batch = BatchApproval {
            approved: Vec::new(),
            failures: Vec::new(),
        };
        for (uid, outcome) in outcomes {
            match outcome {
                Ok(result) => batch.approved.push(result),
                Err(e) => {
                    tracing::warn!(scope_uid = %scope_uid, uid = %uid, error = %e, "Batch approval failed");
                    batch.failures.push((uid, e));
                }
            }
        }

        tracing::info!(
            scope_uid = %scope_uid,
            approved = batch.approved.len(),
            failed = batch.failures.len(),
            correlation_id = %metadata.correlation_id(),
            "Batch approval finished"
        );
        Ok(batch)
    }
}
