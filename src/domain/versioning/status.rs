//! Library item status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of one version of a library item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LibraryItemStatus {
    /// Editable working copy. At most one open draft exists per uid.
    Draft,

    /// Approved, read-only version.
    Final,

    /// Inactivated version. Can be reactivated or deleted.
    Retired,
}

impl LibraryItemStatus {
    /// All statuses, in pointer column order.
    pub const ALL: [LibraryItemStatus; 3] = [
        LibraryItemStatus::Draft,
        LibraryItemStatus::Final,
        LibraryItemStatus::Retired,
    ];

    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryItemStatus::Draft => "DRAFT",
            LibraryItemStatus::Final => "FINAL",
            LibraryItemStatus::Retired => "RETIRED",
        }
    }

    /// Returns true if content can be edited in this status.
    pub fn is_editable(&self) -> bool {
        matches!(self, LibraryItemStatus::Draft)
    }
}

impl StateMachine for LibraryItemStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use LibraryItemStatus::*;
        matches!(
            (self, target),
            // Edit, and cascade of a draft
            (Draft, Draft)
                | (Draft, Final) // Approve
                | (Final, Draft) // New version
                | (Final, Final) // Cascade of an approved item
                | (Final, Retired) // Inactivate
                | (Retired, Final) // Reactivate
                | (Retired, Retired) // Cascade of a retired item
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use LibraryItemStatus::*;
        match self {
            Draft => vec![Draft, Final],
            Final => vec![Draft, Final, Retired],
            Retired => vec![Final, Retired],
        }
    }
}

impl fmt::Display for LibraryItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LibraryItemStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(LibraryItemStatus::Draft),
            "FINAL" => Ok(LibraryItemStatus::Final),
            "RETIRED" => Ok(LibraryItemStatus::Retired),
            _ => Err(ValidationError::invalid_format(
                "status",
                format!("unknown status '{}'", s),
            )),
        }
    }
}
