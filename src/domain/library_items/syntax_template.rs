//! Syntax templates: text with `[Parameter]` placeholders.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::template_parameter_type;
use crate::domain::foundation::{Uid, ValidationError};
use crate::domain::versioning::{ExistenceChecks, ValueObject, VersionMetadata};

/// Extracts placeholder names from template text, in order of appearance.
///
/// Rejects nested, unbalanced and empty placeholders.
pub fn parse_parameters(text: &str) -> Result<Vec<String>, ValidationError> {
    let mut parameters = Vec::new();
    let mut current: Option<String> = None;

    for c in text.chars() {
        match c {
            '[' => {
                if current.is_some() {
                    return Err(ValidationError::invalid_format("name", "nested '[' in template"));
                }
                current = Some(String::new());
            }
            ']' => {
                let name = current.take().ok_or_else(|| {
                    ValidationError::invalid_format("name", "unbalanced ']' in template")
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ValidationError::invalid_format("name", "empty parameter placeholder"));
                }
                parameters.push(name.to_string());
            }
            _ => {
                if let Some(buffer) = current.as_mut() {
                    buffer.push(c);
                }
            }
        }
    }

    if current.is_some() {
        return Err(ValidationError::invalid_format("name", "unclosed '[' in template"));
    }
    Ok(parameters)
}

/// Replaces each `[Parameter]` placeholder with its bound value.
pub fn render(text: &str, bindings: &BTreeMap<String, String>) -> Result<String, ValidationError> {
    parse_parameters(text)?;

    let mut rendered = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let close = after_open
            .find(']')
            .ok_or_else(|| ValidationError::invalid_format("name", "unclosed '[' in template"))?;
        let parameter = after_open[..close].trim();
        let value = bindings.get(parameter).ok_or_else(|| {
            ValidationError::invalid_format(
                "parameter_bindings",
                format!("no value bound for parameter [{}]", parameter),
            )
        })?;
        rendered.push_str(value);
        rest = &after_open[close + 1..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

/// Content of a syntax template (objective, endpoint, criteria...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateValue {
    /// Template text, e.g. `To assess [Intervention] in [Population]`.
    pub name: String,
    pub guidance_text: Option<String>,
}

impl TemplateValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guidance_text: None,
        }
    }

    pub fn with_guidance(mut self, guidance_text: impl Into<String>) -> Self {
        self.guidance_text = Some(guidance_text.into());
        self
    }

    /// Placeholder names in order of appearance.
    pub fn parameters(&self) -> Result<Vec<String>, ValidationError> {
        parse_parameters(&self.name)
    }
}

impl ValueObject for TemplateValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, checks: &dyn ExistenceChecks) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        let parameter_type = template_parameter_type();
        for parameter in self.parameters()? {
            let parameter_uid = Uid::new(parameter.as_str())?;
            if !checks.exists(&parameter_type, &parameter_uid) {
                return Err(ValidationError::unknown_reference(
                    "name",
                    parameter_type.as_str(),
                    parameter,
                ));
            }
        }
        Ok(())
    }

    fn validate_edit(
        &self,
        previous: &Self,
        previous_metadata: &VersionMetadata,
    ) -> Result<(), ValidationError> {
        if previous_metadata.number.is_pre_release() {
            return Ok(());
        }
        if self.parameters()? != previous.parameters()? {
            return Err(ValidationError::invalid_format(
                "name",
                "parameters cannot be changed once the template has been approved",
            ));
        }
        Ok(())
    }

    fn derived_content(&self) -> Option<&str> {
        Some(&self.name)
    }
}
