//! Value object contract for versioned library items.
//!
//! A value object is the entity-specific, immutable bag of fields stored in
//! each snapshot. Structural equality (`PartialEq`) decides both no-op edits
//! and storage deduplication.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use super::VersionMetadata;
use crate::domain::foundation::{EntityType, Uid, ValidationError};

/// Existence lookups a value object needs to validate its references.
///
/// Any `Fn(&EntityType, &Uid) -> bool` closure implements this trait.
pub trait ExistenceChecks: Send + Sync {
    /// Returns true if an item of `entity_type` with `uid` exists.
    fn exists(&self, entity_type: &EntityType, uid: &Uid) -> bool;
}

impl<F> ExistenceChecks for F
where
    F: Fn(&EntityType, &Uid) -> bool + Send + Sync,
{
    fn exists(&self, entity_type: &EntityType, uid: &Uid) -> bool {
        self(entity_type, uid)
    }
}

/// Existence checks that accept every reference.
///
/// Used for value objects without references and for trusted imports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExistenceChecks;

impl ExistenceChecks for NoExistenceChecks {
    fn exists(&self, _entity_type: &EntityType, _uid: &Uid) -> bool {
        true
    }
}

/// Entity-specific content of a library item.
pub trait ValueObject:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Display name of the item.
    fn name(&self) -> &str;

    /// Business validation run on create, edit and new version.
    fn validate(&self, checks: &dyn ExistenceChecks) -> Result<(), ValidationError>;

    /// Extra checks comparing a proposed value with the value it replaces.
    fn validate_edit(
        &self,
        _previous: &Self,
        _previous_metadata: &VersionMetadata,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Uid of the item this one is derived from, if any.
    ///
    /// Audit entries are grouped by this scope and creation registers a
    /// dependency on it.
    fn parent_scope(&self) -> Option<&Uid> {
        None
    }

    /// Content that dependents re-derive from when this item is approved.
    fn derived_content(&self) -> Option<&str> {
        None
    }
}

/// A value object that can be rebuilt from the derived content of its source.
pub trait Rederivable: ValueObject {
    /// Returns the value re-derived from new source content, keeping this
    /// value's own bindings.
    fn rederive(&self, source_uid: &Uid, source_content: &str) -> Result<Self, ValidationError>;
}
