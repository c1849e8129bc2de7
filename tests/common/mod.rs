//! Shared wiring for integration tests: in-memory storage, two libraries
//! and services for compounds, templates and instances.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use mdr_lifecycle::adapters::Storage;
use mdr_lifecycle::application::{
    CascadePropagator, CreateItem, ItemTransition, LibraryItemService,
};
use mdr_lifecycle::config::VersioningConfig;
use mdr_lifecycle::domain::foundation::{AuthorId, CommandMetadata, Uid};
use mdr_lifecycle::domain::library_items::{
    compound_type, syntax_instance_type, syntax_template_type, CompoundValue, InstanceValue,
    TemplateValue,
};
use mdr_lifecycle::domain::versioning::{Library, NoExistenceChecks};

pub const SPONSOR: &str = "Sponsor";
pub const CDISC: &str = "CDISC";

pub struct Harness {
    pub storage: Storage,
    pub compounds: Arc<LibraryItemService<CompoundValue>>,
    pub templates: Arc<LibraryItemService<TemplateValue>>,
    pub instances: Arc<LibraryItemService<InstanceValue>>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(VersioningConfig::default()).await
    }

    pub async fn with_config(versioning: VersioningConfig) -> Self {
        let storage = Storage::in_memory(&versioning);
        storage
            .register_library(&Library::editable(SPONSOR))
            .await
            .unwrap();
        storage
            .register_library(&Library::read_only(CDISC))
            .await
            .unwrap();

        let instance_ports = storage.ports::<InstanceValue>(syntax_instance_type()).unwrap();
        let dependencies = instance_ports.dependencies.clone();
        let instances = Arc::new(LibraryItemService::new(
            instance_ports,
            Arc::new(NoExistenceChecks),
        ));

        let propagator = Arc::new(
            CascadePropagator::new(dependencies, versioning.cascade_max_depth)
                .with_target(instances.clone()),
        );
        let templates = Arc::new(
            LibraryItemService::new(
                storage.ports::<TemplateValue>(syntax_template_type()).unwrap(),
                Arc::new(NoExistenceChecks),
            )
            .with_cascade(propagator),
        );
        let compounds = Arc::new(LibraryItemService::new(
            storage.ports::<CompoundValue>(compound_type()).unwrap(),
            Arc::new(NoExistenceChecks),
        ));

        Self {
            storage,
            compounds,
            templates,
            instances,
        }
    }

    pub async fn create_compound(&self, name: &str) -> Uid {
        self.compounds
            .create(CreateItem::new(SPONSOR, CompoundValue::new(name)), &by("A"))
            .await
            .unwrap()
            .item
            .uid()
            .unwrap()
            .clone()
    }

    /// Creates and approves a template (version 1.0).
    pub async fn approved_template(&self, text: &str) -> Uid {
        let uid = self
            .templates
            .create(CreateItem::new(SPONSOR, TemplateValue::new(text)), &by("A"))
            .await
            .unwrap()
            .item
            .uid()
            .unwrap()
            .clone();
        self.templates
            .approve(ItemTransition::new(uid.clone()), &by("A"))
            .await
            .unwrap();
        uid
    }

    /// Creates an instance of `template_uid` with the given bindings.
    pub async fn create_instance(
        &self,
        template_uid: &Uid,
        template_text: &str,
        pairs: &[(&str, &str)],
    ) -> Uid {
        let value = InstanceValue::new(
            template_uid.clone(),
            syntax_template_type(),
            template_text,
            bindings(pairs),
        )
        .unwrap();
        self.instances
            .create(CreateItem::new(SPONSOR, value), &by("B"))
            .await
            .unwrap()
            .item
            .uid()
            .unwrap()
            .clone()
    }
}

pub fn by(author: &str) -> CommandMetadata {
    CommandMetadata::new(AuthorId::new(author).unwrap())
}

pub fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
