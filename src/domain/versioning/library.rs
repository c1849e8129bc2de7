//! Library descriptor.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// The library an item belongs to. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub is_editable: bool,
}

impl Library {
    /// Creates an editable library.
    pub fn editable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_editable: true,
        }
    }

    /// Creates a read-only library (e.g., an imported standard).
    pub fn read_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_editable: false,
        }
    }

    /// Fails with `InvalidTransition` unless items in this library may be mutated.
    pub fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.is_editable {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(format!(
                "Library '{}' is not editable",
                self.name
            ))
            .with_detail("library", self.name.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn read_only_library_rejects_mutation() {
        let err = Library::read_only("CDISC").ensure_editable().unwrap_err();
        assert!(err.is(ErrorCode::InvalidTransition));
        assert_eq!(err.detail("library"), Some("CDISC"));
    }

    #[test]
    fn editable_library_accepts_mutation() {
        assert!(Library::editable("Sponsor").ensure_editable().is_ok());
    }
}
