//! Audit trail entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    AuditEntryId, AuthorId, EntityType, Timestamp, Uid, ValidationError,
};
use crate::domain::versioning::SnapshotRef;

/// The lifecycle operation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Edit,
    Approve,
    NewVersion,
    Inactivate,
    Reactivate,
    Delete,
    CascadeUpdate,
}

impl AuditAction {
    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Edit => "edit",
            AuditAction::Approve => "approve",
            AuditAction::NewVersion => "new_version",
            AuditAction::Inactivate => "inactivate",
            AuditAction::Reactivate => "reactivate",
            AuditAction::Delete => "delete",
            AuditAction::CascadeUpdate => "cascade_update",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(AuditAction::Create),
            "edit" => Ok(AuditAction::Edit),
            "approve" => Ok(AuditAction::Approve),
            "new_version" => Ok(AuditAction::NewVersion),
            "inactivate" => Ok(AuditAction::Inactivate),
            "reactivate" => Ok(AuditAction::Reactivate),
            "delete" => Ok(AuditAction::Delete),
            "cascade_update" => Ok(AuditAction::CascadeUpdate),
            _ => Err(ValidationError::invalid_format(
                "action",
                format!("unknown audit action '{}'", s),
            )),
        }
    }
}

/// One append-only record of a lifecycle operation.
///
/// `before` is the snapshot that was current when the operation started
/// (absent on create); `after` is the snapshot it produced (absent on delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub uid: Uid,
    pub entity_type: EntityType,
    pub scope_uid: Option<Uid>,
    pub action: AuditAction,
    pub occurred_at: Timestamp,
    pub author: AuthorId,
    pub before: Option<SnapshotRef>,
    pub after: Option<SnapshotRef>,
}

impl AuditEntry {
    /// Creates an entry with a fresh id.
    pub fn new(
        uid: Uid,
        entity_type: EntityType,
        action: AuditAction,
        author: AuthorId,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            uid,
            entity_type,
            scope_uid: None,
            action,
            occurred_at,
            author,
            before: None,
            after: None,
        }
    }

    /// Builder: Group the entry under a parent scope.
    pub fn with_scope(mut self, scope_uid: Option<Uid>) -> Self {
        self.scope_uid = scope_uid;
        self
    }

    /// Builder: Reference the snapshot that was current before the operation.
    pub fn with_before(mut self, before: Option<SnapshotRef>) -> Self {
        self.before = before;
        self
    }

    /// Builder: Reference the snapshot produced by the operation.
    pub fn with_after(mut self, after: Option<SnapshotRef>) -> Self {
        self.after = after;
        self
    }
}
