//! Application layer - Commands, queries and orchestration.
//!
//! This layer loads aggregates through the ports, applies one lifecycle
//! transition per command and coordinates cross-aggregate work (cascades,
//! batch approvals).

pub mod library_items;

pub use library_items::{
    ApprovalOutcome, BatchApproval, CascadeApplied, CascadePropagator, CascadeTarget, CreateItem,
    CreateNewVersion, EditDraft, ItemTransition, LibraryItemService, LifecycleResult,
};
