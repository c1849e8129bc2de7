//! Syntax instances: a template rendered with concrete parameter values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::syntax_template::{parse_parameters, render};
use crate::domain::foundation::{EntityType, Uid, ValidationError};
use crate::domain::versioning::{ExistenceChecks, Rederivable, ValueObject};

/// Content of a syntax instance.
///
/// The source is usually a syntax template; an instance can itself be the
/// source of a further specialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceValue {
    pub template_uid: Uid,
    pub template_type: EntityType,
    /// Source text the instance was rendered from.
    pub template_text: String,
    pub bindings: BTreeMap<String, String>,
    /// Rendered text.
    pub name: String,
}

impl InstanceValue {
    /// Renders a new instance. Every placeholder needs a binding and every
    /// binding must name a placeholder.
    pub fn new(
        template_uid: Uid,
        template_type: EntityType,
        template_text: impl Into<String>,
        bindings: BTreeMap<String, String>,
    ) -> Result<Self, ValidationError> {
        let template_text = template_text.into();
        let parameters = parse_parameters(&template_text)?;
        if let Some(unused) = bindings.keys().find(|k| !parameters.contains(*k)) {
            return Err(ValidationError::invalid_format(
                "parameter_bindings",
                format!("parameter [{}] does not occur in the template", unused),
            ));
        }
        Self::rendered(template_uid, template_type, template_text, bindings)
    }

    fn rendered(
        template_uid: Uid,
        template_type: EntityType,
        template_text: String,
        bindings: BTreeMap<String, String>,
    ) -> Result<Self, ValidationError> {
        let name = render(&template_text, &bindings)?;
        Ok(Self {
            template_uid,
            template_type,
            template_text,
            bindings,
            name,
        })
    }
}

impl ValueObject for InstanceValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, checks: &dyn ExistenceChecks) -> Result<(), ValidationError> {
        if !checks.exists(&self.template_type, &self.template_uid) {
            return Err(ValidationError::unknown_reference(
                "template_uid",
                self.template_type.as_str(),
                self.template_uid.as_str(),
            ));
        }
        if render(&self.template_text, &self.bindings)? != self.name {
            return Err(ValidationError::invalid_format(
                "name",
                "rendered name does not match the template and bindings",
            ));
        }
        Ok(())
    }

    fn parent_scope(&self) -> Option<&Uid> {
        Some(&self.template_uid)
    }

    fn derived_content(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl Rederivable for InstanceValue {
    fn rederive(&self, source_uid: &Uid, source_content: &str) -> Result<Self, ValidationError> {
        if source_uid != &self.template_uid {
            return Err(ValidationError::invalid_format(
                "template_uid",
                format!(
                    "instance derives from {}, not from {}",
                    self.template_uid, source_uid
                ),
            ));
        }
        Self::rendered(
            self.template_uid.clone(),
            self.template_type.clone(),
            source_content.to_string(),
            self.bindings.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::library_items::syntax_template_type;
    use crate::domain::versioning::NoExistenceChecks;

    fn template_uid() -> Uid {
        Uid::new("ObjectiveTemplate_000001").unwrap()
    }

    fn instance() -> InstanceValue {
        let bindings = [("Intervention", "aspirin"), ("Population", "adults")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        InstanceValue::new(
            template_uid(),
            syntax_template_type(),
            "To assess [Intervention] in [Population]",
            bindings,
        )
        .unwrap()
    }

    #[test]
    fn new_renders_name() {
        assert_eq!(instance().name, "To assess aspirin in adults");
        assert_eq!(instance().parent_scope(), Some(&template_uid()));
    }

    #[test]
    fn new_rejects_bindings_for_absent_parameters() {
        let bindings = [("Comparator".to_string(), "placebo".to_string())]
            .into_iter()
            .collect();
        let result = InstanceValue::new(template_uid(), syntax_template_type(), "To assess", bindings);
        assert!(result.is_err());
    }

    #[test]
    fn rederive_keeps_bindings() {
        let original = instance();
        let rederived = original
            .rederive(&template_uid(), "To evaluate [Intervention] in [Population]")
            .unwrap();

        assert_eq!(rederived.name, "To evaluate aspirin in adults");
        assert_eq!(rederived.bindings, original.bindings);
        assert!(rederived.validate(&NoExistenceChecks).is_ok());
    }

    #[test]
    fn rederive_from_other_source_fails() {
        let other = Uid::new("ObjectiveTemplate_000002").unwrap();
        assert!(instance().rederive(&other, "[Intervention]").is_err());
    }

    #[test]
    fn validate_rejects_missing_template() {
        let checks = |_: &EntityType, _: &Uid| false;
        let err = instance().validate(&checks).unwrap_err();
        assert_eq!(err.field(), "template_uid");
    }

    #[test]
    fn validate_rejects_tampered_name() {
        let mut value = instance();
        value.name = "Something else".to_string();
        assert!(value.validate(&NoExistenceChecks).is_err());
    }
}
