//! PostgreSQL scope lock using transaction-scoped advisory locks.
//!
//! The guard owns an open transaction; the advisory lock is released when
//! the transaction ends, which happens when the guard is dropped.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use super::db_error;
use crate::domain::foundation::{DomainError, Uid};
use crate::ports::{ScopeGuard, ScopeLock};

/// SQLSTATE `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

#[derive(Clone)]
pub struct PostgresScopeLock {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresScopeLock {
    /// Creates a new PostgresScopeLock.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ScopeLock for PostgresScopeLock {
    async fn acquire(&self, scope_uid: &Uid) -> Result<ScopeGuard, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin scope lock transaction"))?;

        // SET does not accept bind parameters.
        let set_timeout = format!("SET LOCAL lock_timeout = {}", self.timeout.as_millis());
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(db_error("set lock timeout"))?;

        let locked = sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(scope_uid.as_str())
            .execute(&mut *tx)
            .await;

        match locked {
            Ok(_) => {
                tracing::debug!(scope_uid = %scope_uid, "Scope lock acquired");
                Ok(ScopeGuard::new(scope_uid.clone(), tx))
            }
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(LOCK_NOT_AVAILABLE) => {
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
            Err(e) => Err(db_error("acquire scope lock")(e)),
        }
    }
}
