//! In-memory uid counters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, EntityType, Uid};
use crate::ports::UidGenerator;

/// Per-entity-type counters held in memory. Counters start at 1.
#[derive(Debug, Clone)]
pub struct InMemoryUidGenerator {
    counters: Arc<Mutex<HashMap<EntityType, u64>>>,
    padding: usize,
}

impl InMemoryUidGenerator {
    pub fn new(padding: usize) -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
            padding,
        }
    }
}

#[async_trait]
impl UidGenerator for InMemoryUidGenerator {
    async fn next_uid(&self, entity_type: &EntityType) -> Result<Uid, DomainError> {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(entity_type.clone()).or_insert(0);
        *counter += 1;
        Ok(Uid::generated(entity_type, *counter, self.padding))
    }
}
