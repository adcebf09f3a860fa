use serde_json::json;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{ActivityOperation, CrudOperation, Endpoint},
};

use super::*;
use crate::{
    actions::{ActionType, Phase},
    normalize::{NormalizedResponse, NormalizedResult},
};

fn action_type(operation: CrudOperation, kind: EntityKind, phase: Phase) -> ActionType {
    ActionType {
        endpoint: Endpoint::crud(operation, kind),
        phase,
    }
}

fn fetched(kind: EntityKind, records: &[Value]) -> Action {
    let mut entities = Entities::new();
    let table = entities.entry(kind).or_default();
    let mut ids = Vec::new();
    for record in records {
        let id = RecordId(record["id"].as_i64().expect("id"));
        ids.push(id);
        table.insert(id, record.clone());
    }
    Action::Success {
        action_type: action_type(CrudOperation::Get, kind, Phase::Success),
        target: None,
        outcome: Outcome::Normalized(NormalizedResponse {
            entities,
            result: NormalizedResult::Many(ids),
        }),
    }
}

fn deleted(kind: EntityKind, id: i64) -> Action {
    Action::Success {
        action_type: action_type(CrudOperation::Delete, kind, Phase::Success),
        target: Some(RecordId(id)),
        outcome: Outcome::Deleted {
            kind,
            id: RecordId(id),
        },
    }
}

fn seeded() -> NormalizedStore {
    let state = reduce(
        &NormalizedStore::new(),
        &fetched(
            EntityKind::Description,
            &[
                json!({ "id": 1, "type": { "code": "1" } }),
                json!({ "id": 2, "type": { "code": "2" } }),
                json!({ "id": 3, "type": { "code": "3" } }),
            ],
        ),
    );
    reduce(
        &state,
        &fetched(EntityKind::Sector, &[json!({ "id": 10, "percentage": 100 })]),
    )
}

#[test]
fn applying_the_same_success_twice_is_idempotent() {
    let action = fetched(
        EntityKind::HumanitarianScope,
        &[json!({ "id": 4, "code": 3, "type": { "code": 1 } })],
    );
    let once = reduce(&seeded(), &action);
    let twice = reduce(&once, &action);
    assert_eq!(once, twice);
    assert!(Arc::ptr_eq(
        once.table(EntityKind::HumanitarianScope).expect("table"),
        twice.table(EntityKind::HumanitarianScope).expect("table"),
    ));
}

#[test]
fn merge_overwrites_leaves_and_keeps_other_fields() {
    let state = reduce(
        &NormalizedStore::new(),
        &fetched(
            EntityKind::Activity,
            &[json!({
                "id": 5,
                "title": { "narratives": [{ "text": "Old" }] },
                "activity_status": { "code": "2" },
            })],
        ),
    );
    let state = reduce(
        &state,
        &fetched(
            EntityKind::Activity,
            &[json!({ "id": 5, "title": { "narratives": [{ "text": "New" }] } })],
        ),
    );
    assert_eq!(
        state.get(EntityKind::Activity, RecordId(5)),
        Some(&json!({
            "id": 5,
            "title": { "narratives": [{ "text": "New" }] },
            "activity_status": { "code": "2" },
        }))
    );
}

#[test]
fn delete_removes_exactly_one_key() {
    let before = seeded();
    let after = reduce(&before, &deleted(EntityKind::Description, 2));

    let before_table = before.table(EntityKind::Description).expect("table");
    let after_table = after.table(EntityKind::Description).expect("table");
    let mut expected = (**before_table).clone();
    expected.remove(&RecordId(2));
    assert_eq!(**after_table, expected);
    assert!(Arc::ptr_eq(
        before.table(EntityKind::Sector).expect("table"),
        after.table(EntityKind::Sector).expect("table"),
    ));
}

#[test]
fn delete_of_unknown_id_leaves_state_untouched() {
    let before = seeded();
    let after = reduce(&before, &deleted(EntityKind::Description, 99));
    assert!(Arc::ptr_eq(
        before.table(EntityKind::Description).expect("table"),
        after.table(EntityKind::Description).expect("table"),
    ));
}

#[test]
fn deleting_the_activity_drops_its_entry() {
    let state = reduce(
        &NormalizedStore::new(),
        &fetched(EntityKind::Activity, &[json!({ "id": 5 }), json!({ "id": 6 })]),
    );
    let state = reduce(&state, &deleted(EntityKind::Activity, 5));
    assert_eq!(state.len(EntityKind::Activity), 1);
    assert!(state.get(EntityKind::Activity, RecordId(6)).is_some());
}

#[test]
fn requests_failures_and_raw_responses_are_no_ops() {
    let before = seeded();
    let actions = [
        Action::Request {
            action_type: action_type(CrudOperation::Create, EntityKind::Sector, Phase::Request),
            target: None,
        },
        Action::Failure {
            action_type: action_type(CrudOperation::Create, EntityKind::Sector, Phase::Failure),
            target: None,
            error: ApiError::new(ErrorCode::Upstream, "boom"),
        },
        Action::Success {
            action_type: ActionType {
                endpoint: Endpoint::activity(ActivityOperation::GetModified),
                phase: Phase::Success,
            },
            target: None,
            outcome: Outcome::Raw(json!([{ "id": 1 }])),
        },
    ];
    for action in &actions {
        let after = reduce(&before, action);
        assert_eq!(after, before);
        for kind in before.kinds() {
            assert!(Arc::ptr_eq(
                before.table(kind).expect("table"),
                after.table(kind).expect("table"),
            ));
        }
    }
}

#[test]
fn deep_merge_replaces_arrays_wholesale() {
    let mut target = json!({ "narratives": [{ "text": "a" }, { "text": "b" }] });
    deep_merge(&mut target, &json!({ "narratives": [{ "text": "c" }] }));
    assert_eq!(target, json!({ "narratives": [{ "text": "c" }] }));
}
