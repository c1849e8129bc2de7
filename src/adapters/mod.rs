//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - Process-local implementations of every port
//! - `postgres` - PostgreSQL implementations (schema in `migrations/`)
//!
//! [`Storage`] picks one adapter set from configuration and hands out
//! [`LifecyclePorts`] per entity type.

pub(crate) mod errors;
pub mod memory;
pub mod postgres;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::{AppConfig, DatabaseConfig, StorageBackend, VersioningConfig};
use crate::domain::foundation::{DomainError, EntityType};
use crate::domain::versioning::{Library, ValueObject};
use crate::ports::LifecyclePorts;

use memory::{
    InMemoryAuditTrail, InMemoryDependencyGraph, InMemoryLibraryItemRepository,
    InMemoryLibraryRegistry, InMemoryScopeLock, InMemoryUidGenerator,
};
use postgres::{
    PostgresAuditTrail, PostgresDependencyGraph, PostgresLibraryItemRepository,
    PostgresLibraryRegistry, PostgresScopeLock, PostgresUidGenerator,
};

/// Shared adapter set for one process.
#[derive(Clone)]
pub struct Storage {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Memory(MemoryStorage),
    Postgres(PostgresStorage),
}

#[derive(Clone)]
struct MemoryStorage {
    audit: InMemoryAuditTrail,
    uids: InMemoryUidGenerator,
    libraries: InMemoryLibraryRegistry,
    dependencies: InMemoryDependencyGraph,
    scope_lock: InMemoryScopeLock,
    repositories: Arc<Mutex<HashMap<EntityType, Arc<dyn Any + Send + Sync>>>>,
}

#[derive(Clone)]
struct PostgresStorage {
    pool: PgPool,
    audit: PostgresAuditTrail,
    uids: PostgresUidGenerator,
    libraries: PostgresLibraryRegistry,
    dependencies: PostgresDependencyGraph,
    scope_lock: PostgresScopeLock,
}

impl Storage {
    /// Builds the backend selected by `config.storage`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        match config.storage.backend {
            StorageBackend::Memory => Ok(Self::in_memory(&config.versioning)),
            StorageBackend::Postgres => Self::postgres(&config.database, &config.versioning).await,
        }
    }

    pub fn in_memory(versioning: &VersioningConfig) -> Self {
        Self {
            backend: Backend::Memory(MemoryStorage {
                audit: InMemoryAuditTrail::new(),
                uids: InMemoryUidGenerator::new(versioning.uid_padding),
                libraries: InMemoryLibraryRegistry::new(),
                dependencies: InMemoryDependencyGraph::new(),
                scope_lock: InMemoryScopeLock::new(versioning.scope_lock_timeout()),
                repositories: Arc::new(Mutex::new(HashMap::new())),
            }),
        }
    }

    /// Connects a pool and, if configured, applies migrations.
    pub async fn postgres(
        database: &DatabaseConfig,
        versioning: &VersioningConfig,
    ) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .min_connections(database.min_connections)
            .max_connections(database.max_connections)
            .acquire_timeout(database.acquire_timeout())
            .idle_timeout(database.idle_timeout())
            .connect(&database.url)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to connect to {}: {}",
                    database.redacted_url(),
                    e
                ))
            })?;

        if database.run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to run migrations: {}", e)))?;
            tracing::info!("Database migrations applied");
        }

        tracing::info!(url = %database.redacted_url(), "Connected to PostgreSQL");
        Ok(Self::with_pool(pool, versioning))
    }

    /// Wraps an existing pool. The schema must already be in place.
    pub fn with_pool(pool: PgPool, versioning: &VersioningConfig) -> Self {
        Self {
            backend: Backend::Postgres(PostgresStorage {
                audit: PostgresAuditTrail::new(pool.clone()),
                uids: PostgresUidGenerator::new(pool.clone(), versioning.uid_padding),
                libraries: PostgresLibraryRegistry::new(pool.clone()),
                dependencies: PostgresDependencyGraph::new(pool.clone()),
                scope_lock: PostgresScopeLock::new(pool.clone(), versioning.scope_lock_timeout()),
                pool,
            }),
        }
    }

    /// Registers a library. An existing library with the same name is kept.
    pub async fn register_library(&self, library: &Library) -> Result<(), DomainError> {
        match &self.backend {
            Backend::Memory(memory) => {
                memory.libraries.register(library.clone()).await;
                Ok(())
            }
            Backend::Postgres(pg) => pg.libraries.register(library).await,
        }
    }

    /// Ports for items of `entity_type` holding values of type `V`.
    ///
    /// Repeated calls for the same entity type share storage.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the entity type was already bound to a
    ///   different value type
    pub fn ports<V: ValueObject>(&self, entity_type: EntityType) -> Result<LifecyclePorts<V>, DomainError> {
        match &self.backend {
            Backend::Memory(memory) => {
                let repository = memory.repository::<V>(entity_type)?;
                Ok(LifecyclePorts {
                    repository: Arc::new(repository),
                    uids: Arc::new(memory.uids.clone()),
                    libraries: Arc::new(memory.libraries.clone()),
                    audit: Arc::new(memory.audit.clone()),
                    dependencies: Arc::new(memory.dependencies.clone()),
                    scope_lock: Arc::new(memory.scope_lock.clone()),
                })
            }
            Backend::Postgres(pg) => Ok(LifecyclePorts {
                repository: Arc::new(PostgresLibraryItemRepository::<V>::new(
                    pg.pool.clone(),
                    entity_type,
                )),
                uids: Arc::new(pg.uids.clone()),
                libraries: Arc::new(pg.libraries.clone()),
                audit: Arc::new(pg.audit.clone()),
                dependencies: Arc::new(pg.dependencies.clone()),
                scope_lock: Arc::new(pg.scope_lock.clone()),
            }),
        }
    }
}

impl MemoryStorage {
    fn repository<V: ValueObject>(
        &self,
        entity_type: EntityType,
    ) -> Result<InMemoryLibraryItemRepository<V>, DomainError> {
        let mut repositories = self
            .repositories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let shared = repositories
            .entry(entity_type.clone())
            .or_insert_with(|| {
                let repository: Arc<dyn Any + Send + Sync> = Arc::new(
                    InMemoryLibraryItemRepository::<V>::new(
                        entity_type.clone(),
                        self.audit.clone(),
                        self.dependencies.clone(),
                    ),
                );
                repository
            })
            .clone();

        shared
            .downcast::<InMemoryLibraryItemRepository<V>>()
            .map(|repository| (*repository).clone())
            .map_err(|_| {
                DomainError::validation(
                    "entity_type",
                    format!("{} is bound to a different value type", entity_type),
                )
            })
    }
}
