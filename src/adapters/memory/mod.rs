//! In-memory adapters.
//!
//! Complete implementations of every persistence port, used by tests and
//! by `storage.backend = "memory"` deployments.

mod audit_trail;
mod dependency_graph;
mod item_repository;
mod library_registry;
mod scope_lock;
mod uid_generator;

pub use audit_trail::InMemoryAuditTrail;
pub use dependency_graph::InMemoryDependencyGraph;
pub use item_repository::InMemoryLibraryItemRepository;
pub use library_registry::InMemoryLibraryRegistry;
pub use scope_lock::InMemoryScopeLock;
pub use uid_generator::InMemoryUidGenerator;
