//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, time, errors, state machine)
//! - `versioning` - Draft/Final/Retired lifecycle, snapshots and temporal index
//! - `audit` - Append-only audit entries
//! - `cascade` - Template-to-instance dependencies and cascade reports
//! - `library_items` - Compounds, syntax templates and syntax instances

pub mod audit;
pub mod cascade;
pub mod foundation;
pub mod library_items;
pub mod versioning;
