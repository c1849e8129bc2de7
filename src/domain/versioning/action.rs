//! User-facing lifecycle actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An action a caller may invoke on the current version of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectAction {
    Approve,
    Edit,
    Delete,
    NewVersion,
    Inactivate,
    Reactivate,
}

impl fmt::Display for ObjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectAction::Approve => "approve",
            ObjectAction::Edit => "edit",
            ObjectAction::Delete => "delete",
            ObjectAction::NewVersion => "new_version",
            ObjectAction::Inactivate => "inactivate",
            ObjectAction::Reactivate => "reactivate",
        };
        write!(f, "{}", s)
    }
}
