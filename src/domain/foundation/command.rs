//! Command infrastructure for lifecycle handlers.
//!
//! Every mutating service call takes a `CommandMetadata` instead of loose
//! `author` / `correlation_id` parameters. The author ends up in the version
//! metadata and the audit entry; the correlation id ends up in log fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthorId;

/// Metadata context for lifecycle commands.
///
/// # Example
///
/// ```ignore
/// let metadata = CommandMetadata::new(AuthorId::new("JD")?)
///     .with_correlation_id("import-2024-01")
///     .with_source("bulk-import");
///
/// let approved = compounds.approve(ItemTransition::new(uid), &metadata).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// The author recorded on the new snapshot and its audit entry.
    pub author: AuthorId,

    /// Links related operations across a single request or batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    /// Source of this command (e.g., "api", "bulk-import", "cascade").
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Creates new command metadata with the required author.
    pub fn new(author: AuthorId) -> Self {
        Self {
            author,
            correlation_id: None,
            source: None,
        }
    }

    /// Builder: Add correlation ID for request tracing.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Builder: Add source identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the correlation ID, generating one if not set.
    pub fn correlation_id(&self) -> String {
        self.correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Returns the correlation ID only if explicitly set.
    pub fn correlation_id_opt(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the source if set.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

#[cfg(test)]
impl CommandMetadata {
    /// Creates a test fixture with a test author.
    pub fn test_fixture() -> Self {
        Self::new(AuthorId::new("test-author").unwrap())
            .with_correlation_id("test-correlation-id")
            .with_source("test")
    }
}
