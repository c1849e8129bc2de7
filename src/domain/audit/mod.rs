//! Audit module - Append-only record of every lifecycle operation.

mod entry;

pub use entry::{AuditAction, AuditEntry};
