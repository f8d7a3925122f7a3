mod common;

use common::{color_request, count_rows, create_size, setup, RecordingStore};
use storefront_core::{
    AssignmentRequest, AssignmentService, AttributeChanges, AttributeService, CatalogError,
    CreateValueOptionRequest, ErrorKind,
};

fn assert_inconsistency(err: CatalogError, operation: &str, expected: usize, actual: usize) {
    assert_eq!(err.kind(), ErrorKind::Internal);
    match err {
        CatalogError::InternalInconsistency {
            operation: reported,
            expected: reported_expected,
            actual: reported_actual,
        } => {
            assert_eq!(reported, operation);
            assert_eq!(reported_expected, expected);
            assert_eq!(reported_actual, actual);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unconfirmed_attribute_insert_rolls_back() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    store.misreport("insert_attribute", 0);

    let err = catalog.create_attribute(&color_request()).unwrap_err();

    assert_inconsistency(err, "attribute_insert", 1, 0);
    assert_eq!(count_rows(&conn, "attributes"), 0);
}

#[test]
fn over_reported_attribute_insert_is_also_rejected() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    store.misreport("insert_attribute", 2);

    let err = catalog.create_attribute(&color_request()).unwrap_err();

    assert_inconsistency(err, "attribute_insert", 1, 2);
    assert_eq!(count_rows(&conn, "attributes"), 0);
}

#[test]
fn unconfirmed_update_keeps_stored_definition() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    let color = catalog.create_attribute(&color_request()).unwrap();
    store.misreport("update_attribute", 0);

    let err = catalog
        .update_attribute(
            color.id,
            &AttributeChanges {
                required: Some(false),
                sort_weight: Some(9),
                ..AttributeChanges::default()
            },
        )
        .unwrap_err();

    assert_inconsistency(err, "attribute_update", 1, 0);
    assert_eq!(catalog.get_attribute(color.id).unwrap(), color);
}

#[test]
fn unconfirmed_definition_delete_keeps_definition_and_values() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    let (size, values) = create_size(&catalog);
    store.misreport("delete_attribute_by_id", 0);
    store.clear();

    let err = catalog.delete_attribute(size.id).unwrap_err();

    assert_inconsistency(err, "attribute_delete", 1, 0);
    assert!(!store.called("delete_value_options_by_attribute_id"));
    assert_eq!(catalog.get_attribute(size.id).unwrap(), size);
    assert_eq!(catalog.list_values_for_attribute(size.id).unwrap(), values);
}

#[test]
fn partial_value_cascade_rolls_back_definition_delete() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    let (size, values) = create_size(&catalog);
    store.misreport("delete_value_options_by_attribute_id", values.len() - 1);

    let err = catalog.delete_attribute(size.id).unwrap_err();

    assert_inconsistency(err, "value_option_cascade_delete", 3, 2);
    assert_eq!(count_rows(&conn, "attributes"), 1);
    assert_eq!(count_rows(&conn, "attribute_values"), 3);
    let restored = catalog.get_attribute_with_values(size.id).unwrap();
    assert_eq!(restored.definition, size);
    assert_eq!(restored.values, values);
}

#[test]
fn unconfirmed_value_option_insert_rolls_back() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    let (size, _) = create_size(&catalog);
    store.misreport("insert_value_option", 0);

    let err = catalog
        .create_value_option(
            size.id,
            &CreateValueOptionRequest {
                value: "XL".to_string(),
                sort_weight: 40,
            },
        )
        .unwrap_err();

    assert_inconsistency(err, "value_option_insert", 1, 0);
    assert_eq!(count_rows(&conn, "attribute_values"), 3);
}

#[test]
fn short_batch_insert_rolls_back_every_assignment() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    let assignments = AssignmentService::new(&store);
    let color = catalog.create_attribute(&color_request()).unwrap();
    let (size, values) = create_size(&catalog);
    store.misreport("batch_insert_assignments", 1);

    let err = assignments
        .ensure_item_attributes(
            42,
            &[
                AssignmentRequest::text(color.id, "red"),
                AssignmentRequest::selected(size.id, values[1].id),
            ],
        )
        .unwrap_err();

    assert_inconsistency(err, "assignment_batch_insert", 2, 1);
    assert_eq!(count_rows(&conn, "item_attributes"), 0);
}

#[test]
fn short_assignment_delete_keeps_current_assignments() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    let assignments = AssignmentService::new(&store);
    let color = catalog.create_attribute(&color_request()).unwrap();
    let (size, values) = create_size(&catalog);
    assignments
        .ensure_item_attributes(
            42,
            &[
                AssignmentRequest::text(color.id, "red"),
                AssignmentRequest::selected(size.id, values[0].id),
            ],
        )
        .unwrap();
    let before = assignments.list_item_attributes(42).unwrap();
    store.misreport("delete_assignments_by_item_and_attribute_ids", 1);
    store.clear();

    let err = assignments.ensure_item_attributes(42, &[]).unwrap_err();

    assert_inconsistency(err, "assignment_delete", 2, 1);
    assert!(!store.called("batch_insert_assignments"));
    assert_eq!(assignments.list_item_attributes(42).unwrap(), before);
}

#[test]
fn failed_reconcile_does_not_touch_other_items() {
    let conn = setup();
    let store = RecordingStore::new(&conn);
    let catalog = AttributeService::new(&store);
    let assignments = AssignmentService::new(&store);
    let color = catalog.create_attribute(&color_request()).unwrap();
    assignments
        .ensure_item_attributes(1, &[AssignmentRequest::text(color.id, "red")])
        .unwrap();
    store.misreport("batch_insert_assignments", 0);

    assignments
        .ensure_item_attributes(2, &[AssignmentRequest::text(color.id, "blue")])
        .unwrap_err();

    assert_eq!(assignments.list_item_attributes(1).unwrap().len(), 1);
    assert!(assignments.list_item_attributes(2).unwrap().is_empty());
}
