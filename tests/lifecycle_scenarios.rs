//! End-to-end lifecycle scenarios against in-memory storage.

mod common;

use common::*;
use mdr_lifecycle::application::{CreateItem, CreateNewVersion, EditDraft, ItemTransition};
use mdr_lifecycle::domain::audit::AuditAction;
use mdr_lifecycle::domain::foundation::{ErrorCode, Timestamp, Uid};
use mdr_lifecycle::domain::library_items::CompoundValue;
use mdr_lifecycle::domain::versioning::{
    LibraryItemStatus, ObjectAction, VersionFilter, VersionNumber,
};

fn v(major: u32, minor: u32) -> VersionNumber {
    VersionNumber::new(major, minor)
}

#[tokio::test]
async fn full_lifecycle_of_a_compound() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    let compounds = &h.compounds;

    let approved = compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert_eq!(approved.item.status(), LibraryItemStatus::Final);
    assert_eq!(approved.item.metadata().number, v(1, 0));

    let drafted = compounds
        .create_new_version(CreateNewVersion::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert_eq!(drafted.item.status(), LibraryItemStatus::Draft);
    assert_eq!(drafted.item.metadata().number, v(1, 1));

    let edited = compounds
        .edit_draft(
            EditDraft::new(uid.clone(), CompoundValue::new("Y"), "rename"),
            &by("A"),
        )
        .await
        .unwrap();
    assert_eq!(edited.item.metadata().number, v(1, 2));
    assert_eq!(edited.item.value().name, "Y");

    let approved = compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert_eq!(approved.item.metadata().number, v(2, 0));

    let retired = compounds
        .inactivate(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert_eq!(retired.item.status(), LibraryItemStatus::Retired);
    assert_eq!(retired.item.metadata().number, v(2, 0));

    let reactivated = compounds
        .reactivate(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert_eq!(reactivated.item.status(), LibraryItemStatus::Final);
    assert_eq!(reactivated.item.metadata().number, v(2, 0));

    let history = compounds.get_version_history(&uid).await.unwrap();
    let versions: Vec<_> = history
        .iter()
        .map(|s| (s.metadata.version(), s.metadata.status))
        .collect();
    assert_eq!(
        versions,
        vec![
            ("2.0".to_string(), LibraryItemStatus::Final),
            ("2.0".to_string(), LibraryItemStatus::Retired),
            ("2.0".to_string(), LibraryItemStatus::Final),
            ("1.2".to_string(), LibraryItemStatus::Draft),
            ("1.1".to_string(), LibraryItemStatus::Draft),
            ("1.0".to_string(), LibraryItemStatus::Final),
            ("0.1".to_string(), LibraryItemStatus::Draft),
        ]
    );
    assert!(history[0].metadata.is_open());
    assert!(history[1..].iter().all(|s| !s.metadata.is_open()));

    let actions: Vec<_> = compounds
        .history_for(&uid)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Create,
            AuditAction::Approve,
            AuditAction::NewVersion,
            AuditAction::Edit,
            AuditAction::Approve,
            AuditAction::Inactivate,
            AuditAction::Reactivate,
        ]
    );
}

#[tokio::test]
async fn possible_actions_follow_status_and_major_number() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    let compounds = &h.compounds;
    let actions = || compounds.get_possible_actions(&uid);

    assert_eq!(
        actions().await.unwrap(),
        vec![ObjectAction::Approve, ObjectAction::Edit, ObjectAction::Delete]
    );

    compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert_eq!(
        actions().await.unwrap(),
        vec![ObjectAction::Inactivate, ObjectAction::NewVersion]
    );

    compounds
        .create_new_version(CreateNewVersion::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    // A draft that has been approved before can no longer be deleted.
    assert_eq!(actions().await.unwrap(), vec![ObjectAction::Approve, ObjectAction::Edit]);

    compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    compounds
        .inactivate(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert_eq!(
        actions().await.unwrap(),
        vec![ObjectAction::Reactivate, ObjectAction::Delete]
    );
}

#[tokio::test]
async fn transitions_outside_the_action_set_are_rejected() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    let compounds = &h.compounds;

    let err = compounds
        .inactivate(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransition));
    assert_eq!(err.detail("status"), Some("DRAFT"));

    let err = compounds
        .create_new_version(CreateNewVersion::new(uid.clone()), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransition));

    compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();

    let err = compounds
        .edit_draft(
            EditDraft::new(uid.clone(), CompoundValue::new("Y"), "rename"),
            &by("A"),
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransition));

    let err = compounds
        .delete_retired(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransition));

    // Nothing was stored by the rejected calls.
    assert_eq!(compounds.get_version_history(&uid).await.unwrap().len(), 2);
}

#[tokio::test]
async fn resubmitting_the_same_value_is_a_noop() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;

    for _ in 0..3 {
        let result = h
            .compounds
            .edit_draft(
                EditDraft::new(uid.clone(), CompoundValue::new("X"), "again"),
                &by("A"),
            )
            .await
            .unwrap();
        assert!(result.is_noop());
        assert_eq!(result.item.metadata().number, VersionNumber::INITIAL);
    }

    assert_eq!(h.compounds.get_version_history(&uid).await.unwrap().len(), 1);
    assert_eq!(h.compounds.history_for(&uid).await.unwrap().len(), 1);
}

#[tokio::test]
async fn edit_requires_change_description() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;

    let err = h
        .compounds
        .edit_draft(
            EditDraft::new(uid.clone(), CompoundValue::new("Y"), "  "),
            &by("A"),
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::ValidationFailed));
}

#[tokio::test]
async fn invalid_values_are_rejected_before_anything_is_stored() {
    let h = Harness::new().await;
    let err = h
        .compounds
        .create(CreateItem::new(SPONSOR, CompoundValue::new("  ")), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::ValidationFailed));

    // The failed create consumed no uid.
    let uid = h.create_compound("X").await;
    assert_eq!(uid.as_str(), "Compound_000001");
}

#[tokio::test]
async fn errors_carry_the_item_context() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    h.compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();

    let err = h
        .compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransition));
    assert_eq!(err.detail("uid"), Some(uid.as_str()));
    assert_eq!(err.detail("entity_type"), Some("Compound"));
    assert_eq!(err.detail("status"), Some("FINAL"));
    assert_eq!(err.detail("version"), Some("1.0"));

    let err = h
        .compounds
        .edit_draft(EditDraft::new(uid.clone(), CompoundValue::new("Y"), "rename"), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransition));
    assert_eq!(err.detail("uid"), Some(uid.as_str()));
    assert_eq!(err.detail("entity_type"), Some("Compound"));

    h.compounds
        .create_new_version(CreateNewVersion::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    let err = h
        .compounds
        .edit_draft(EditDraft::new(uid.clone(), CompoundValue::new(" "), "blank"), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::ValidationFailed));
    assert_eq!(err.detail("field"), Some("name"));
    assert_eq!(err.detail("uid"), Some(uid.as_str()));
    assert_eq!(err.detail("entity_type"), Some("Compound"));
    assert_eq!(err.detail("status"), Some("DRAFT"));
    assert_eq!(err.detail("version"), Some("1.1"));

    let err = h
        .compounds
        .create(CreateItem::new(SPONSOR, CompoundValue::new("")), &by("A"))
        .await
        .unwrap_err();
    assert_eq!(err.detail("entity_type"), Some("Compound"));
    assert_eq!(err.detail("field"), Some("name"));
}

#[tokio::test]
async fn read_only_library_rejects_creation() {
    let h = Harness::new().await;
    let err = h
        .compounds
        .create(CreateItem::new(CDISC, CompoundValue::new("X")), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransition));
}

#[tokio::test]
async fn uids_are_sequential_per_entity_type() {
    let h = Harness::new().await;
    let first = h.create_compound("X").await;
    let second = h.create_compound("Y").await;
    let template = h.approved_template("To treat [Indication]").await;

    assert_eq!(first.as_str(), "Compound_000001");
    assert_eq!(second.as_str(), "Compound_000002");
    assert!(template.as_str().ends_with("_000001"));
}

#[tokio::test]
async fn find_by_uid_resolves_version_status_and_time() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    let compounds = &h.compounds;

    let before_approval = Timestamp::now();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    compounds
        .create_new_version(
            CreateNewVersion::new(uid.clone()).with_value(CompoundValue::new("Y")),
            &by("A"),
        )
        .await
        .unwrap();

    let latest = compounds
        .find_by_uid(&uid, &VersionFilter::latest())
        .await
        .unwrap();
    assert_eq!(latest.metadata.number, v(1, 1));
    assert_eq!(latest.value.name, "Y");

    let final_version = compounds
        .find_by_uid(&uid, &VersionFilter::status(LibraryItemStatus::Final))
        .await
        .unwrap();
    assert_eq!(final_version.metadata.number, v(1, 0));
    assert_eq!(final_version.value.name, "X");

    let initial = compounds
        .find_by_uid(&uid, &VersionFilter::version(VersionNumber::INITIAL))
        .await
        .unwrap();
    assert_eq!(initial.metadata.status, LibraryItemStatus::Draft);

    let then = compounds
        .find_by_uid(&uid, &VersionFilter::at(before_approval))
        .await
        .unwrap();
    assert_eq!(then.metadata.number, VersionNumber::INITIAL);

    let err = compounds
        .find_by_uid(&uid, &VersionFilter::version(v(7, 0)))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::NotFound));

    let err = compounds
        .find_by_uid(&uid, &VersionFilter::status(LibraryItemStatus::Retired))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::NotFound));
}

#[tokio::test]
async fn unknown_uid_is_not_found() {
    let h = Harness::new().await;
    let missing = Uid::new("Compound_999999").unwrap();

    let err = h
        .compounds
        .approve(ItemTransition::new(missing.clone()), &by("A"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::NotFound));

    let err = h.compounds.get_possible_actions(&missing).await.unwrap_err();
    assert!(err.is(ErrorCode::NotFound));
}

#[tokio::test]
async fn new_version_with_unchanged_value_keeps_content() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    h.compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();

    let result = h
        .compounds
        .create_new_version(
            CreateNewVersion::new(uid.clone())
                .with_value(CompoundValue::new("X"))
                .with_description("Review"),
            &by("A"),
        )
        .await
        .unwrap();

    assert_eq!(result.item.metadata().change_description, "Review");
    assert_eq!(result.item.value().name, "X");
    assert!(result.receipt.as_ref().unwrap().value_reused);
}

#[tokio::test]
async fn delete_retired_tombstones_but_keeps_history() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    let compounds = &h.compounds;
    compounds
        .approve(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    compounds
        .inactivate(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();

    let result = compounds
        .delete_retired(ItemTransition::new(uid.clone()), &by("A"))
        .await
        .unwrap();
    assert!(result.receipt.unwrap().snapshot.is_none());

    let err = compounds
        .find_by_uid(&uid, &VersionFilter::latest())
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::NotFound));

    let entries = compounds.history_for(&uid).await.unwrap();
    let last = entries.last().unwrap();
    assert_eq!(last.action, AuditAction::Delete);
    assert!(last.after.is_none());
    assert_eq!(
        last.before.as_ref().map(|r| r.status),
        Some(LibraryItemStatus::Retired)
    );
}

#[tokio::test]
async fn audit_entries_reference_before_and_after_snapshots() {
    let h = Harness::new().await;
    let uid = h.create_compound("X").await;
    h.compounds
        .approve(ItemTransition::new(uid.clone()), &by("Reviewer"))
        .await
        .unwrap();

    let entries = h.compounds.history_for(&uid).await.unwrap();
    assert_eq!(entries.len(), 2);

    let create = &entries[0];
    assert!(create.before.is_none());
    assert_eq!(create.after.as_ref().unwrap().version, VersionNumber::INITIAL);
    assert_eq!(create.author.as_str(), "A");

    let approve = &entries[1];
    assert_eq!(approve.before, create.after);
    assert_eq!(approve.after.as_ref().unwrap().version, v(1, 0));
    assert_eq!(approve.author.as_str(), "Reviewer");
    assert!(!approve.occurred_at.is_before(&create.occurred_at));
}

#[tokio::test]
async fn history_for_scope_groups_instances_under_their_template() {
    let h = Harness::new().await;
    let text = "To treat [Indication]";
    let template = h.approved_template(text).await;
    let first = h.create_instance(&template, text, &[("Indication", "pain")]).await;
    let second = h.create_instance(&template, text, &[("Indication", "fever")]).await;
    h.instances
        .approve(ItemTransition::new(first.clone()), &by("B"))
        .await
        .unwrap();

    let entries = h.instances.history_for_scope(&template).await.unwrap();
    let summary: Vec<_> = entries.iter().map(|e| (e.uid.clone(), e.action)).collect();
    assert_eq!(
        summary,
        vec![
            (first.clone(), AuditAction::Create),
            (second, AuditAction::Create),
            (first, AuditAction::Approve),
        ]
    );
    assert!(entries.iter().all(|e| e.scope_uid.as_ref() == Some(&template)));
}
