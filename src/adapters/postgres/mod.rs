//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresLibraryItemRepository` - Versioned items, values and pointers
//! - `PostgresAuditTrail` - Audit entries ordered by insertion
//! - `PostgresDependencyGraph` - Source-to-dependent edges
//! - `PostgresUidGenerator` - Per-entity-type counters
//! - `PostgresLibraryRegistry` - Library descriptors
//! - `PostgresScopeLock` - Advisory locks held by an open transaction
//!
//! The schema lives in `migrations/`.

mod audit_trail;
mod dependency_graph;
mod item_repository;
mod library_registry;
mod scope_lock;
mod uid_generator;

pub use audit_trail::PostgresAuditTrail;
pub use dependency_graph::PostgresDependencyGraph;
pub use item_repository::PostgresLibraryItemRepository;
pub use library_registry::PostgresLibraryRegistry;
pub use scope_lock::PostgresScopeLock;
pub use uid_generator::PostgresUidGenerator;

pub(crate) use audit_trail::insert_audit_entry;
pub(crate) use dependency_graph::{delete_incoming_edges, insert_dependency};

use crate::domain::foundation::DomainError;

/// Maps a sqlx error to `StorageFailure`, naming the failed action.
pub(crate) fn db_error(action: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::storage(format!("Failed to {}: {}", action, e))
}
