//! In-memory dependency graph.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::cascade::Dependency;
use crate::domain::foundation::{DomainError, Uid};
use crate::ports::DependencyGraph;

#[derive(Debug, Clone, Default)]
pub struct InMemoryDependencyGraph {
    edges: Arc<RwLock<Vec<Dependency>>>,
}

impl InMemoryDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DependencyGraph for InMemoryDependencyGraph {
    async fn add(&self, dependency: Dependency) -> Result<(), DomainError> {
        let mut edges = self.edges.write().await;
        if !edges.contains(&dependency) {
            edges.push(dependency);
        }
        Ok(())
    }

    async fn dependents_of(&self, source_uid: &Uid) -> Result<Vec<Dependency>, DomainError> {
        let edges = self.edges.read().await;
        Ok(edges
            .iter()
            .filter(|d| &d.source_uid == source_uid)
            .cloned()
            .collect())
    }

    async fn remove_dependent(&self, dependent_uid: &Uid) -> Result<(), DomainError> {
        self.edges
            .write()
            .await
            .retain(|d| &d.dependent_uid != dependent_uid);
        Ok(())
    }
}
