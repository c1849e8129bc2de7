//! Version numbers and per-snapshot version metadata.
//!
//! `VersionMetadata` is never mutated: every lifecycle transition builds a
//! fresh value from the current one. The transition constructors enforce the
//! status preconditions and the numbering rules:
//!
//! | Transition | From | To | Number |
//! |---|---|---|---|
//! | initial | - | Draft | 0.1 |
//! | edited | Draft | Draft | minor + 1 |
//! | approved | Draft | Final | major + 1, minor 0 |
//! | new_draft | Final | Draft | minor + 1 |
//! | inactivated | Final | Retired | unchanged |
//! | reactivated | Retired | Final | unchanged |
//! | cascaded | any | same | Draft: minor + 1, otherwise major + 1 |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{LibraryItemStatus, ObjectAction};
use crate::domain::foundation::{
    AuthorId, DomainError, StateMachine, Timestamp, Uid, ValidationError,
};

pub const INITIAL_VERSION_DESCRIPTION: &str = "Initial version";
pub const APPROVED_VERSION_DESCRIPTION: &str = "Approved version";
pub const NEW_DRAFT_DESCRIPTION: &str = "New draft created";
pub const INACTIVATED_VERSION_DESCRIPTION: &str = "Inactivated version";
pub const REACTIVATED_VERSION_DESCRIPTION: &str = "Reactivated version";

/// A `major.minor` version number.
///
/// Ordering is lexicographic on (major, minor), so `1.10 > 1.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
}

impl VersionNumber {
    /// The number of a freshly created item.
    pub const INITIAL: VersionNumber = VersionNumber { major: 0, minor: 1 };

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns the number with the minor part incremented.
    pub fn next_minor(&self) -> Self {
        Self::new(self.major, self.minor + 1)
    }

    /// Returns the next major number with minor reset to zero.
    pub fn next_major(&self) -> Self {
        Self::new(self.major + 1, 0)
    }

    /// Returns true if the item has never been approved at this number.
    pub fn is_pre_release(&self) -> bool {
        self.major == 0
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for VersionNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::invalid_format("version", format!("'{}' is not major.minor", s));
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

/// Version metadata attached to every stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub status: LibraryItemStatus,
    pub number: VersionNumber,
    pub author: AuthorId,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub change_description: String,
}

impl VersionMetadata {
    /// Metadata of a freshly created item: DRAFT 0.1.
    pub fn initial(author: AuthorId, at: Timestamp) -> Self {
        Self {
            status: LibraryItemStatus::Draft,
            number: VersionNumber::INITIAL,
            author,
            start_date: at,
            end_date: None,
            change_description: INITIAL_VERSION_DESCRIPTION.to_string(),
        }
    }

    /// Rebuilds metadata from stored parts.
    pub fn restore(
        status: LibraryItemStatus,
        number: VersionNumber,
        author: AuthorId,
        start_date: Timestamp,
        end_date: Option<Timestamp>,
        change_description: impl Into<String>,
    ) -> Self {
        Self {
            status,
            number,
            author,
            start_date,
            end_date,
            change_description: change_description.into(),
        }
    }

    /// The rendered `major.minor` version.
    pub fn version(&self) -> String {
        self.number.to_string()
    }

    /// Returns true while this snapshot is the open (current) one.
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Returns a copy of this metadata closed at `end`.
    pub fn closed_at(&self, end: Timestamp) -> Self {
        Self {
            end_date: Some(end),
            ..self.clone()
        }
    }

    /// Next DRAFT after an edit of the current DRAFT.
    pub fn edited(
        &self,
        author: AuthorId,
        at: Timestamp,
        change_description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        self.require(LibraryItemStatus::Draft, LibraryItemStatus::Draft, "Edit")?;
        Ok(self.next(
            LibraryItemStatus::Draft,
            self.number.next_minor(),
            author,
            at,
            change_description.into(),
        ))
    }

    /// FINAL produced by approving the current DRAFT.
    pub fn approved(&self, author: AuthorId, at: Timestamp) -> Result<Self, DomainError> {
        self.require(LibraryItemStatus::Draft, LibraryItemStatus::Final, "Approve")?;
        Ok(self.next(
            LibraryItemStatus::Final,
            self.number.next_major(),
            author,
            at,
            APPROVED_VERSION_DESCRIPTION.to_string(),
        ))
    }

    /// DRAFT opened on top of the current FINAL.
    pub fn new_draft(
        &self,
        author: AuthorId,
        at: Timestamp,
        change_description: Option<String>,
    ) -> Result<Self, DomainError> {
        self.require(LibraryItemStatus::Final, LibraryItemStatus::Draft, "New version")?;
        Ok(self.next(
            LibraryItemStatus::Draft,
            self.number.next_minor(),
            author,
            at,
            change_description.unwrap_or_else(|| NEW_DRAFT_DESCRIPTION.to_string()),
        ))
    }

    /// RETIRED produced by inactivating the current FINAL.
    pub fn inactivated(&self, author: AuthorId, at: Timestamp) -> Result<Self, DomainError> {
        self.require(LibraryItemStatus::Final, LibraryItemStatus::Retired, "Inactivate")?;
        Ok(self.next(
            LibraryItemStatus::Retired,
            self.number,
            author,
            at,
            INACTIVATED_VERSION_DESCRIPTION.to_string(),
        ))
    }

    /// FINAL produced by reactivating the current RETIRED.
    pub fn reactivated(&self, author: AuthorId, at: Timestamp) -> Result<Self, DomainError> {
        self.require(LibraryItemStatus::Retired, LibraryItemStatus::Final, "Reactivate")?;
        Ok(self.next(
            LibraryItemStatus::Final,
            self.number,
            author,
            at,
            REACTIVATED_VERSION_DESCRIPTION.to_string(),
        ))
    }

    /// Trusted transition applied by cascade propagation. Keeps the status.
    pub fn cascaded(&self, author: AuthorId, at: Timestamp, source_uid: &Uid) -> Self {
        let number = match self.status {
            LibraryItemStatus::Draft => self.number.next_minor(),
            LibraryItemStatus::Final | LibraryItemStatus::Retired => self.number.next_major(),
        };
        self.next(
            self.status,
            number,
            author,
            at,
            format!("Cascading update from template {}", source_uid),
        )
    }

    /// Actions available on this version, before reference checks.
    pub fn possible_actions(&self) -> Vec<ObjectAction> {
        match self.status {
            LibraryItemStatus::Draft if self.number.is_pre_release() => {
                vec![ObjectAction::Approve, ObjectAction::Edit, ObjectAction::Delete]
            }
            LibraryItemStatus::Draft => vec![ObjectAction::Approve, ObjectAction::Edit],
            LibraryItemStatus::Final => vec![ObjectAction::Inactivate, ObjectAction::NewVersion],
            LibraryItemStatus::Retired => vec![ObjectAction::Reactivate, ObjectAction::Delete],
        }
    }

    /// Fails with `InvalidTransition` unless the current status is `expected`.
    pub fn require_status(
        &self,
        expected: LibraryItemStatus,
        operation: &str,
    ) -> Result<(), DomainError> {
        if self.status == expected {
            return Ok(());
        }
        Err(DomainError::invalid_transition(format!(
            "{} requires a {} version, but version {} is {}",
            operation, expected, self.number, self.status
        ))
        .with_detail("status", self.status.as_str())
        .with_detail("version", self.version()))
    }

    fn require(
        &self,
        expected: LibraryItemStatus,
        target: LibraryItemStatus,
        operation: &str,
    ) -> Result<(), DomainError> {
        self.require_status(expected, operation)?;
        self.status
            .transition_to(target)
            .map(|_| ())
            .map_err(|e| {
                DomainError::invalid_transition(e.to_string())
                    .with_detail("status", self.status.as_str())
                    .with_detail("version", self.version())
            })
    }

    fn next(
        &self,
        status: LibraryItemStatus,
        number: VersionNumber,
        author: AuthorId,
        at: Timestamp,
        change_description: String,
    ) -> Self {
        Self {
            status,
            number,
            author,
            start_date: at.max(self.start_date),
            end_date: None,
            change_description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    fn author() -> AuthorId {
        AuthorId::new("JD").unwrap()
    }

    fn draft() -> VersionMetadata {
        VersionMetadata::initial(author(), Timestamp::now())
    }

    #[test]
    fn version_number_orders_numerically() {
        assert!(VersionNumber::new(1, 10) > VersionNumber::new(1, 9));
        assert!(VersionNumber::new(2, 0) > VersionNumber::new(1, 99));
    }

    #[test]
    fn version_number_parses_and_displays() {
        let v: VersionNumber = "12.3".parse().unwrap();
        assert_eq!(v, VersionNumber::new(12, 3));
        assert_eq!(v.to_string(), "12.3");
        assert!("1".parse::<VersionNumber>().is_err());
        assert!("a.b".parse::<VersionNumber>().is_err());
    }

    #[test]
    fn initial_is_draft_zero_one() {
        let md = draft();
        assert_eq!(md.status, LibraryItemStatus::Draft);
        assert_eq!(md.version(), "0.1");
        assert_eq!(md.change_description, INITIAL_VERSION_DESCRIPTION);
        assert!(md.is_open());
    }

    #[test]
    fn full_cycle_numbers() {
        let md = draft();
        let md = md.approved(author(), Timestamp::now()).unwrap();
        assert_eq!(md.version(), "1.0");
        let md = md.new_draft(author(), Timestamp::now(), None).unwrap();
        assert_eq!(md.version(), "1.1");
        assert_eq!(md.change_description, NEW_DRAFT_DESCRIPTION);
        let md = md.edited(author(), Timestamp::now(), "typo").unwrap();
        assert_eq!(md.version(), "1.2");
        let md = md.approved(author(), Timestamp::now()).unwrap();
        assert_eq!(md.version(), "2.0");
        let md = md.inactivated(author(), Timestamp::now()).unwrap();
        assert_eq!((md.status, md.version()), (LibraryItemStatus::Retired, "2.0".to_string()));
        let md = md.reactivated(author(), Timestamp::now()).unwrap();
        assert_eq!((md.status, md.version()), (LibraryItemStatus::Final, "2.0".to_string()));
    }

    #[test]
    fn approve_of_final_is_invalid_transition() {
        let md = draft().approved(author(), Timestamp::now()).unwrap();
        let err = md.approved(author(), Timestamp::now()).unwrap_err();
        assert!(err.is(ErrorCode::InvalidTransition));
        assert_eq!(err.detail("status"), Some("FINAL"));
        assert_eq!(err.detail("version"), Some("1.0"));
    }

    #[test]
    fn inactivate_of_draft_is_invalid_transition() {
        let err = draft().inactivated(author(), Timestamp::now()).unwrap_err();
        assert!(err.is(ErrorCode::InvalidTransition));
    }

    #[test]
    fn start_date_never_moves_backwards() {
        let md = VersionMetadata::initial(author(), Timestamp::now().plus_secs(60));
        let earlier = Timestamp::now();
        let next = md.edited(author(), earlier, "edit").unwrap();
        assert_eq!(next.start_date, md.start_date);
    }

    #[test]
    fn cascade_steps_minor_for_draft_and_major_otherwise() {
        let source = Uid::new("Template_000001").unwrap();
        let md = draft();
        let cascaded = md.cascaded(author(), Timestamp::now(), &source);
        assert_eq!(cascaded.version(), "0.2");
        assert_eq!(cascaded.status, LibraryItemStatus::Draft);
        assert_eq!(
            cascaded.change_description,
            "Cascading update from template Template_000001"
        );

        let retired = md
            .approved(author(), Timestamp::now())
            .unwrap()
            .inactivated(author(), Timestamp::now())
            .unwrap();
        let cascaded = retired.cascaded(author(), Timestamp::now(), &source);
        assert_eq!(cascaded.version(), "2.0");
        assert_eq!(cascaded.status, LibraryItemStatus::Retired);
    }

    #[test]
    fn possible_actions_table() {
        let d0 = draft();
        assert_eq!(
            d0.possible_actions(),
            vec![ObjectAction::Approve, ObjectAction::Edit, ObjectAction::Delete]
        );

        let f1 = d0.approved(author(), Timestamp::now()).unwrap();
        assert_eq!(
            f1.possible_actions(),
            vec![ObjectAction::Inactivate, ObjectAction::NewVersion]
        );

        let d1 = f1.new_draft(author(), Timestamp::now(), None).unwrap();
        assert_eq!(d1.possible_actions(), vec![ObjectAction::Approve, ObjectAction::Edit]);

        let r1 = f1.inactivated(author(), Timestamp::now()).unwrap();
        assert_eq!(
            r1.possible_actions(),
            vec![ObjectAction::Reactivate, ObjectAction::Delete]
        );
    }
}
