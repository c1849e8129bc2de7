//! Library item commands, queries and cascade handling.

mod batch;
mod cascade;
mod commands;
mod service;

pub use batch::BatchApproval;
pub use cascade::{CascadeApplied, CascadePropagator, CascadeTarget};
pub use commands::{CreateItem, CreateNewVersion, EditDraft, ItemTransition, LifecycleResult};
pub use service::{ApprovalOutcome, LibraryItemService};
