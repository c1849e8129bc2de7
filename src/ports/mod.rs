//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `LibraryItemRepository` - Versioned items with their temporal index
//! - `AuditTrail` - Append-only lifecycle audit log
//! - `DependencyGraph` - Template-to-instance relation
//! - `UidGenerator` - Per-entity-type uid counters
//! - `LibraryRegistry` - Library descriptors
//!
//! ## Coordination Ports
//!
//! - `ScopeLock` - Exclusive access to a scope for multi-aggregate writes

mod audit_trail;
mod dependency_graph;
mod library_item_repository;
mod library_registry;
mod scope_lock;
mod uid_generator;

pub use audit_trail::AuditTrail;
pub use dependency_graph::DependencyGraph;
pub use library_item_repository::{LibraryItemRepository, SaveReceipt, StoredItem};
pub use library_registry::LibraryRegistry;
pub use scope_lock::{ScopeGuard, ScopeLock};
pub use uid_generator::UidGenerator;

use std::sync::Arc;

use crate::domain::versioning::ValueObject;

/// Every port a library item service needs, for one value object type.
pub struct LifecyclePorts<V: ValueObject> {
    pub repository: Arc<dyn LibraryItemRepository<V>>,
    pub uids: Arc<dyn UidGenerator>,
    pub libraries: Arc<dyn LibraryRegistry>,
    pub audit: Arc<dyn AuditTrail>,
    pub dependencies: Arc<dyn DependencyGraph>,
    pub scope_lock: Arc<dyn ScopeLock>,
}

impl<V: ValueObject> Clone for LifecyclePorts<V> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            uids: self.uids.clone(),
            libraries: self.libraries.clone(),
            audit: self.audit.clone(),
            dependencies: self.dependencies.clone(),
            scope_lock: self.scope_lock.clone(),
        }
    }
}
