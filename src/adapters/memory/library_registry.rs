//! In-memory library registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::versioning::Library;
use crate::ports::LibraryRegistry;

#[derive(Debug, Clone, Default)]
pub struct InMemoryLibraryRegistry {
    libraries: Arc<RwLock<HashMap<String, Library>>>,
}

impl InMemoryLibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with `libraries`.
    pub fn with_libraries(libraries: impl IntoIterator<Item = Library>) -> Self {
        let map = libraries
            .into_iter()
            .map(|l| (l.name.clone(), l))
            .collect();
        Self {
            libraries: Arc::new(RwLock::new(map)),
        }
    }

    /// Registers a library. An existing library with the same name is kept.
    pub async fn register(&self, library: Library) {
        self.libraries
            .write()
            .await
            .entry(library.name.clone())
            .or_insert(library);
    }
}

#[async_trait]
impl LibraryRegistry for InMemoryLibraryRegistry {
    async fn find(&self, name: &str) -> Result<Library, DomainError> {
        self.libraries
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!("Library '{}' not found", name))
                    .with_detail("library", name)
            })
    }
}
