//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, time, the state machine trait, command metadata and
//! the error types that form the vocabulary of the library item domain.

mod command;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AuditEntryId, AuthorId, EntityType, SnapshotId, Uid, ValueId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
