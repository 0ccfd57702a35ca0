mod common;

use chrono::NaiveDate;
use common::{raw_user, seed, setup};
use rowkeep_core::{ErrorKind, FieldPatch, Filter};

#[test]
fn patch_values_are_coerced_date_then_int_then_string() {
    let fixture = setup();
    let stored = seed(&fixture, &["ada"]).remove(0);

    let patches = [
        FieldPatch::new("joined_at", "2023-05-01"),
        FieldPatch::new("age", "42"),
        FieldPatch::new("name", "abc"),
    ];
    let outcome = fixture
        .store
        .patch_one_blocking(&Filter::eq("id", stored.id), &patches, None);

    assert!(outcome.succeeded);
    let patched = outcome.data.unwrap();
    let midnight = NaiveDate::from_ymd_opt(2023, 5, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(patched.joined_at, Some(midnight));
    assert_eq!(patched.age, Some(42));
    assert_eq!(patched.name, "abc");

    let reloaded = fixture
        .store
        .fetch_one_blocking(&Filter::eq("id", stored.id), None)
        .data
        .unwrap();
    assert_eq!(reloaded.user, patched);
}

#[test]
fn patch_targets_first_match_only() {
    let fixture = setup();
    let users = seed(&fixture, &["twin", "twin"]);

    let outcome = fixture.store.patch_one_blocking(
        &Filter::eq("name", "twin"),
        &[FieldPatch::new("age", "7")],
        None,
    );

    assert_eq!(outcome.data.unwrap().id, users[0].id);
    assert_eq!(raw_user(&fixture, users[0].id).unwrap().1, Some(7));
    assert_eq!(raw_user(&fixture, users[1].id).unwrap().1, Some(21));
}

#[test]
fn unknown_field_fails_and_root_scope_leaves_record_untouched() {
    let fixture = setup();
    let stored = seed(&fixture, &["ada"]).remove(0);

    let patches = [
        FieldPatch::new("name", "changed"),
        FieldPatch::new("nickname", "x"),
    ];
    let outcome = fixture
        .store
        .patch_one_blocking(&Filter::eq("id", stored.id), &patches, None);

    assert!(!outcome.succeeded);
    assert!(outcome.data.is_none());
    assert_eq!(
        outcome.error_kind(),
        Some(ErrorKind::FieldResolutionFailure)
    );
    let (name, age, joined_at) = raw_user(&fixture, stored.id).unwrap();
    assert_eq!(name, "ada");
    assert_eq!(age, Some(20));
    assert_eq!(joined_at, None);
}

#[test]
fn value_of_wrong_kind_is_field_resolution_failure() {
    let fixture = setup();
    let stored = seed(&fixture, &["ada"]).remove(0);

    // "42" coerces to an integer, which a text field refuses.
    let outcome = fixture.store.patch_one_blocking(
        &Filter::eq("id", stored.id),
        &[FieldPatch::new("name", "42")],
        None,
    );

    assert_eq!(
        outcome.error_kind(),
        Some(ErrorKind::FieldResolutionFailure)
    );
    assert_eq!(raw_user(&fixture, stored.id).unwrap().0, "ada");
}

#[test]
fn partial_patches_survive_in_joined_scope() {
    let fixture = setup();
    let stored = seed(&fixture, &["ada"]).remove(0);

    let lease = fixture.coordinator.begin("users").unwrap();
    let patches = [FieldPatch::new("age", "30"), FieldPatch::new("nickname", "x")];
    let outcome = fixture.store.patch_one_blocking(
        &Filter::eq("id", stored.id),
        &patches,
        Some(lease.context()),
    );
    assert!(!outcome.succeeded);
    assert!(lease.context().scope().is_active());
    lease.complete(true).unwrap();

    assert_eq!(raw_user(&fixture, stored.id).unwrap().1, Some(30));
}

#[test]
fn patch_without_match_is_not_found() {
    let fixture = setup();

    let outcome = fixture.store.patch_one_blocking(
        &Filter::eq("name", "nobody"),
        &[FieldPatch::new("age", "1")],
        None,
    );

    assert_eq!(outcome.error_kind(), Some(ErrorKind::NotFound));
}

#[test]
fn patch_request_reads_wire_shape() {
    let patch: FieldPatch =
        serde_json::from_str(r#"{ "propertyName": "age", "propertyValue": "5" }"#).unwrap();
    assert_eq!(patch, FieldPatch::new("age", "5"));
}
