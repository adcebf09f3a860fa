use serde_json::json;
use shared::domain::{IndicatorId, PeriodId, ResultId};

use super::*;

fn activity_path() -> ParentPath {
    ParentPath::new(PublisherId(1)).activity(ActivityId(5))
}

fn period_path() -> ParentPath {
    activity_path()
        .result(ResultId(9))
        .indicator(IndicatorId(11))
        .period(PeriodId(21))
}

#[test]
fn create_humanitarian_scope_serializes_the_payload_in_key_order() {
    let descriptor = create(
        EntityKind::HumanitarianScope,
        &activity_path(),
        json!({ "type": { "code": 1 }, "vocabulary": { "code": 2 }, "code": 3 }),
    )
    .expect("descriptor");

    assert_eq!(descriptor.endpoint_name(), "Activity.createHumanitarianScope");
    assert_eq!(
        descriptor.args,
        vec![
            json!(1),
            json!(5),
            json!(r#"{"type":{"code":1},"vocabulary":{"code":2},"code":3}"#),
        ]
    );
    assert_eq!(
        descriptor.schema,
        Some(ResponseSchema::One(EntityKind::HumanitarianScope))
    );
    assert_eq!(
        descriptor.success_kind().to_string(),
        "CREATE_HUMANITARIAN_SCOPE_SUCCESS"
    );
}

#[test]
fn update_activity_drops_null_fields() {
    let descriptor = update_activity(
        PublisherId(1),
        json!({ "id": 5, "legacy_data": null, "country_budget_items": null, "name": "A" }),
    )
    .expect("descriptor");

    assert_eq!(descriptor.endpoint_name(), "Activity.update");
    assert_eq!(descriptor.args, vec![json!(1), json!(r#"{"id":5,"name":"A"}"#)]);
    assert_eq!(descriptor.target, Some(RecordId(5)));
}

#[test]
fn update_activity_stamps_nested_records_with_the_activity_id() {
    let descriptor = update_activity(
        PublisherId(1),
        json!({
            "id": "5",
            "legacy_data": [{ "name": "old" }, { "name": "older" }],
            "country_budget_items": { "vocabulary": { "code": "1" } },
        }),
    )
    .expect("descriptor");

    let Value::String(argument) = &descriptor.args[1] else {
        panic!("payload should be a string argument");
    };
    let payload: Value = serde_json::from_str(argument).expect("payload json");
    assert_eq!(payload["legacy_data"][0]["activity"], json!(5));
    assert_eq!(payload["legacy_data"][1]["activity"], json!(5));
    assert_eq!(payload["country_budget_items"]["activity"], json!(5));
}

#[test]
fn update_activity_without_id_is_rejected() {
    let err = update_activity(PublisherId(1), json!({ "name": "A" })).expect_err("no id");
    assert_eq!(
        err,
        DispatchError::MissingId {
            kind: EntityKind::Activity
        }
    );
}

#[test]
fn child_calls_need_the_activity() {
    let err = create(
        EntityKind::Sector,
        &ParentPath::new(PublisherId(1)),
        json!({ "percentage": 50 }),
    )
    .expect_err("activity missing");
    assert_eq!(
        err,
        DispatchError::MissingAncestors {
            endpoint: "Activity.createSector".to_string(),
            required: Depth::Activity,
            actual: Depth::Publisher,
        }
    );
}

#[test]
fn period_level_update_orders_ancestors_then_id_then_payload() {
    let descriptor = update(
        EntityKind::IndicatorTargetLocation,
        &period_path(),
        RecordId(31),
        json!({ "ref": "L1", "narrative": null }),
    )
    .expect("descriptor");

    assert_eq!(
        descriptor.endpoint_name(),
        "Activity.updateIndicatorTargetLocation"
    );
    assert_eq!(
        descriptor.args,
        vec![
            json!(1),
            json!(5),
            json!(9),
            json!(11),
            json!(21),
            json!(31),
            json!(r#"{"ref":"L1"}"#),
        ]
    );
}

#[test]
fn deeper_ids_are_ignored_for_shallower_kinds() {
    let descriptor = delete(EntityKind::ResultIndicator, &period_path(), RecordId(11))
        .expect("descriptor");
    assert_eq!(descriptor.args, vec![json!(1), json!(5), json!(9), json!(11)]);
    assert_eq!(descriptor.target, Some(RecordId(11)));
    assert_eq!(descriptor.schema, None);
}

#[test]
fn period_scoped_reads_stop_at_the_indicator() {
    let descriptor = get(EntityKind::IndicatorActualDimension, &period_path()).expect("descriptor");
    assert_eq!(descriptor.args, vec![json!(1), json!(5), json!(9), json!(11)]);
    assert_eq!(
        descriptor.schema,
        Some(ResponseSchema::Many(EntityKind::IndicatorActualDimension))
    );
}

#[test]
fn legacy_data_carries_the_activity_inline() {
    let descriptor = create(
        EntityKind::LegacyData,
        &activity_path(),
        json!({ "name": "old", "value": "x" }),
    )
    .expect("descriptor");
    assert_eq!(
        descriptor.args[2],
        json!(r#"{"name":"old","value":"x","activity":5}"#)
    );
}

#[test]
fn activity_kind_routes_through_the_activity_builders() {
    let read = get(EntityKind::Activity, &activity_path()).expect("descriptor");
    assert_eq!(read.endpoint_name(), "Activity.get");
    assert_eq!(read.args, vec![json!(1), json!(5)]);

    let removed = delete(EntityKind::Activity, &activity_path(), RecordId(5)).expect("descriptor");
    assert_eq!(removed.endpoint_name(), "Activity.delete");
    assert_eq!(removed.target, Some(RecordId(5)));

    let err = get(EntityKind::Activity, &ParentPath::new(PublisherId(1))).expect_err("no activity");
    assert!(matches!(err, DispatchError::MissingAncestors { .. }));
}

#[test]
fn code_list_request_echoes_its_name() {
    let descriptor = get_code_list_items("Sector");
    assert_eq!(descriptor.endpoint_name(), "Activity.getCodeListItems");
    assert_eq!(descriptor.args, vec![json!("Sector")]);
    assert_eq!(descriptor.extra.as_deref(), Some("Sector"));
}

#[test]
fn non_object_payloads_are_rejected() {
    let err = create(EntityKind::Budget, &activity_path(), json!([1, 2])).expect_err("array");
    assert_eq!(
        err,
        DispatchError::NotAnObject {
            kind: EntityKind::Budget
        }
    );
}
