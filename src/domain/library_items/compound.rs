//! Compounds.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::active_substance_type;
use crate::domain::foundation::{Uid, ValidationError};
use crate::domain::versioning::{ExistenceChecks, ValueObject};

/// Content of a compound library item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundValue {
    pub name: String,
    pub name_sentence_case: String,
    pub definition: Option<String>,
    pub abbreviation: Option<String>,
    pub is_sponsor_compound: bool,
    pub substance_uids: Vec<Uid>,
}

impl CompoundValue {
    /// Creates a compound with the sentence-case name derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name_sentence_case: name.to_lowercase(),
            name,
            definition: None,
            abbreviation: None,
            is_sponsor_compound: false,
            substance_uids: Vec::new(),
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_substances(mut self, substance_uids: Vec<Uid>) -> Self {
        self.substance_uids = substance_uids;
        self
    }

    pub fn sponsor(mut self) -> Self {
        self.is_sponsor_compound = true;
        self
    }
}

impl ValueObject for CompoundValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, checks: &dyn ExistenceChecks) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if self.name_sentence_case.to_lowercase() != self.name.to_lowercase() {
            return Err(ValidationError::invalid_format(
                "name_sentence_case",
                "must equal the name ignoring case",
            ));
        }

        let substance_type = active_substance_type();
        let mut seen = HashSet::new();
        for uid in &self.substance_uids {
            if !seen.insert(uid) {
                return Err(ValidationError::invalid_format(
                    "substance_uids",
                    format!("substance {} listed twice", uid),
                ));
            }
            if !checks.exists(&substance_type, uid) {
                return Err(ValidationError::unknown_reference(
                    "substance_uids",
                    substance_type.as_str(),
                    uid.as_str(),
                ));
            }
        }
        Ok(())
    }
}
