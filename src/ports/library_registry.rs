//! Library registry port.

use crate::domain::foundation::DomainError;
use crate::domain::versioning::Library;
use async_trait::async_trait;

/// Resolves library descriptors by name.
#[async_trait]
pub trait LibraryRegistry: Send + Sync {
    /// Finds a library by name.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no library has this name
    async fn find(&self, name: &str) -> Result<Library, DomainError>;

    /// Returns true if items in the named library may be mutated.
    async fn is_editable(&self, name: &str) -> Result<bool, DomainError> {
        Ok(self.find(name).await?.is_editable)
    }
}
