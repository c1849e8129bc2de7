//! Library items - Concrete value objects managed by the lifecycle engine.

mod compound;
mod syntax_instance;
mod syntax_template;

pub use compound::CompoundValue;
pub use syntax_instance::InstanceValue;
pub use syntax_template::{parse_parameters, render, TemplateValue};

use crate::domain::foundation::EntityType;

/// Entity type of compounds.
pub fn compound_type() -> EntityType {
    EntityType::from_static("Compound")
}

/// Entity type of active substances referenced by compounds.
pub fn active_substance_type() -> EntityType {
    EntityType::from_static("ActiveSubstance")
}

/// Entity type of template parameters. Parameters are identified by name.
pub fn template_parameter_type() -> EntityType {
    EntityType::from_static("TemplateParameter")
}

/// Entity type of syntax templates.
pub fn syntax_template_type() -> EntityType {
    EntityType::from_static("ObjectiveTemplate")
}

/// Entity type of syntax instances.
pub fn syntax_instance_type() -> EntityType {
    EntityType::from_static("Objective")
}
