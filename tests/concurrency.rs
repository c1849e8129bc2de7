//! Optimistic concurrency and scope locking.

mod common;

use std::sync::Arc;

use common::*;
use mdr_lifecycle::application::{CreateItem, CreateNewVersion, EditDraft, ItemTransition};
use mdr_lifecycle::config::VersioningConfig;
use mdr_lifecycle::domain::foundation::{AuthorId, ErrorCode, Uid};
use mdr_lifecycle::domain::library_items::{
    compound_type, syntax_template_type, CompoundValue, InstanceValue, TemplateValue,
};
use mdr_lifecycle::domain::versioning::{
    EditOutcome, Library, LibraryItemStatus, NoExistenceChecks, VersionNumber, VersionedItem,
};
use mdr_lifecycle::ports::LifecyclePorts;

async fn compound_at_1_1(h: &Harness) -> Uid {
    let uid = h.create_compound("X").await;
    h.compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    h.compounds
        .create_new_version(CreateNewVersion::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    uid
}

#[tokio::test]
async fn second_edit_against_the_same_version_conflicts() {
    let h = Harness::new().await;
    let uid = compound_at_1_1(&h).await;
    let seen = VersionNumber::new(1, 1);

    let first = h
        .compounds
        .edit_draft(
            EditDraft::new(uid.clone(), CompoundValue::new("Y"), "by A").expecting(seen),
            &by("A"),
        )
        .await
        .unwrap();
    assert_eq!(first.item.metadata().number, VersionNumber::new(1, 2));

    let err = h
        .compounds
        .edit_draft(
            EditDraft::new(uid.clone(), CompoundValue::new("Z"), "by B").expecting(seen),
            &by("B"),
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::Conflict));
    assert_eq!(err.detail("version"), Some("1.2"));
    assert_eq!(err.detail("expected_version"), Some("1.1"));

    let latest = h.compounds.get_version_history(&uid).await.unwrap();
    assert_eq!(latest[0].value.name, "Y");
    assert_eq!(latest.len(), 4);
}

async fn load(ports: &LifecyclePorts<CompoundValue>, uid: &Uid) -> VersionedItem<CompoundValue> {
    let stored = ports.repository.load_latest(uid).await.unwrap();
    VersionedItem::from_snapshot(compound_type(), Library::editable(SPONSOR), stored.snapshot)
}

#[tokio::test]
async fn stale_aggregate_cannot_be_saved() {
    let h = Harness::new().await;
    let uid = compound_at_1_1(&h).await;
    let ports = h.storage.ports::<CompoundValue>(compound_type()).unwrap();

    let mut a = load(&ports, &uid).await;
    let mut b = load(&ports, &uid).await;

    let author = AuthorId::new("A").unwrap();
    let outcome = a
        .edit_draft(CompoundValue::new("Y"), "by A", &NoExistenceChecks, author.clone())
        .unwrap();
    assert_eq!(outcome, EditOutcome::Changed);
    b.edit_draft(CompoundValue::new("Z"), "by B", &NoExistenceChecks, author)
        .unwrap();

    ports.repository.save(&a).await.unwrap();
    let err = ports.repository.save(&b).await.unwrap_err();
    assert!(err.is(ErrorCode::Conflict));

    let history = ports.repository.version_history(&uid).await.unwrap();
    assert_eq!(history[0].value.name, "Y");
    assert_eq!(history[0].metadata.number, VersionNumber::new(1, 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_edits_never_fork_the_history() {
    let h = Harness::new().await;
    let uid = compound_at_1_1(&h).await;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let compounds = Arc::clone(&h.compounds);
            let uid = uid.clone();
            tokio::spawn(async move {
                compounds
                    .edit_draft(
                        EditDraft::new(uid, CompoundValue::new(format!("Name {}", i)), "race"),
                        &by("A"),
                    )
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(e.is(ErrorCode::Conflict), "unexpected error: {}", e),
        }
    }
    assert!(succeeded >= 1);

    let history = h.compounds.get_version_history(&uid).await.unwrap();
    assert_eq!(history.len(), 3 + succeeded);
    assert_eq!(
        history[0].metadata.number,
        VersionNumber::new(1, 1 + succeeded as u32)
    );
    assert_eq!(history.iter().filter(|s| s.metadata.is_open()).count(), 1);

    let mut sequences: Vec<_> = history.iter().map(|s| s.sequence).collect();
    sequences.dedup();
    assert_eq!(sequences.len(), history.len());
}

#[tokio::test]
async fn approve_many_reports_per_item_outcomes() {
    let h = Harness::new().await;
    let text = "To treat [Indication]";
    let template = h.approved_template(text).await;
    let first = h.create_instance(&template, text, &[("Indication", "pain")]).await;
    let second = h.create_instance(&template, text, &[("Indication", "fever")]).await;
    let already_final = h.create_instance(&template, text, &[("Indication", "cough")]).await;
    h.instances
        .approve(ItemTransition::new(already_final.clone()), &by("B"))
        .await
        .unwrap();

    let batch = h
        .instances
        .approve_many(
            &template,
            vec![
                ItemTransition::new(first.clone()),
                ItemTransition::new(second.clone()),
                ItemTransition::new(already_final.clone()),
            ],
            &by("B"),
        )
        .await
        .unwrap();

    assert!(!batch.is_complete());
    assert_eq!(batch.approved.len(), 2);
    assert!(batch
        .approved
        .iter()
        .all(|r| r.item.status() == LibraryItemStatus::Final));
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].0, already_final);
    assert!(batch.failures[0].1.is(ErrorCode::InvalidTransition));
}

#[tokio::test]
async fn held_scope_lock_times_out_as_conflict() {
    let h = Harness::with_config(VersioningConfig {
        scope_lock_timeout_ms: 20,
        ..VersioningConfig::default()
    })
    .await;
    let template = h
        .templates
        .create(CreateItem::new(SPONSOR, TemplateValue::new("To treat [Indication]")), &by("A"))
        .await
        .unwrap()
        .item
        .uid()
        .unwrap()
        .clone();

    let ports = h.storage.ports::<TemplateValue>(syntax_template_type()).unwrap();
    let guard = ports.scope_lock.acquire(&template).await.unwrap();

    let err = h
        .templates
        .approve_with_cascade(ItemTransition::new(template.clone()), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::Conflict));

    let err = h
        .instances
        .approve_many(&template, Vec::new(), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::Conflict));

    drop(guard);
    let outcome = h
        .templates
        .approve_with_cascade(ItemTransition::new(template), &by("A"))
        .await
        .unwrap();
    assert_eq!(outcome.result.item.status(), LibraryItemStatus::Final);
}

#[tokio::test]
async fn instance_creation_waits_for_its_template_scope() {
    let h = Harness::with_config(VersioningConfig {
        scope_lock_timeout_ms: 20,
        ..VersioningConfig::default()
    })
    .await;
    let text = "To treat [Indication]";
    let template = h.approved_template(text).await;
    let value = InstanceValue::new(
        template.clone(),
        syntax_template_type(),
        text,
        bindings(&[("Indication", "pain")]),
    )
    .unwrap();

    let ports = h.storage.ports::<TemplateValue>(syntax_template_type()).unwrap();
    let guard = ports.scope_lock.acquire(&template).await.unwrap();

    let err = h
        .instances
        .create(CreateItem::new(SPONSOR, value.clone()), &by("B"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::Conflict));
    assert!(h.instances.find_all(None, None).await.unwrap().is_empty());

    drop(guard);
    h.instances
        .create(CreateItem::new(SPONSOR, value), &by("B"))
        .await
        .unwrap();
    assert_eq!(h.instances.find_all(None, None).await.unwrap().len(), 1);
}
