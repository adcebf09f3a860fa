//! Flattens nested API responses into entity-kind keyed tables.
//!
//! Every kind declares which of its fields embed other entities. Embedded records are lifted
//! into their own table and replaced in the parent by their id.

use std::collections::BTreeMap;

use serde_json::Value;
use shared::domain::{EntityKind, RecordId};
use thiserror::Error;
use tracing::debug;

use crate::{actions::ResponseSchema, payload::record_id};

pub type EntityTable = BTreeMap<RecordId, Value>;
pub type Entities = BTreeMap<EntityKind, EntityTable>;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub entities: Entities,
    pub result: NormalizedResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    One(Option<RecordId>),
    Many(Vec<RecordId>),
    Page {
        count: Option<u64>,
        next: Option<String>,
        ids: Vec<RecordId>,
    },
}

impl NormalizedResult {
    pub fn ids(&self) -> Vec<RecordId> {
        match self {
            NormalizedResult::One(id) => id.iter().copied().collect(),
            NormalizedResult::Many(ids) | NormalizedResult::Page { ids, .. } => ids.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("expected a JSON object for {kind}, got {found}")]
    ExpectedObject { kind: EntityKind, found: &'static str },
    #[error("expected a JSON array of {kind}, got {found}")]
    ExpectedArray { kind: EntityKind, found: &'static str },
    #[error("paginated {kind} response has no `results` array")]
    MissingResults { kind: EntityKind },
}

/// A field (possibly nested, e.g. `target.location`) holding embedded records of `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildKey {
    pub path: &'static [&'static str],
    pub kind: EntityKind,
}

const fn child(path: &'static [&'static str], kind: EntityKind) -> ChildKey {
    ChildKey { path, kind }
}

const ACTIVITY_CHILDREN: &[ChildKey] = &[
    child(&["descriptions"], EntityKind::Description),
    child(&["activity_dates"], EntityKind::Date),
    child(&["contact_info"], EntityKind::Contact),
    child(&["participating_organisations"], EntityKind::ParticipatingOrganisation),
    child(&["recipient_countries"], EntityKind::RecipientCountry),
    child(&["recipient_regions"], EntityKind::RecipientRegion),
    child(&["locations"], EntityKind::Location),
    child(&["sectors"], EntityKind::Sector),
    child(&["policy_markers"], EntityKind::PolicyMarker),
    child(&["document_links"], EntityKind::DocumentLink),
    child(&["humanitarian_scopes"], EntityKind::HumanitarianScope),
    child(&["related_activities"], EntityKind::Relation),
    child(&["budgets"], EntityKind::Budget),
    child(&["planned_disbursements"], EntityKind::PlannedDisbursement),
    child(&["conditions", "condition"], EntityKind::PerformanceCondition),
    child(&["results"], EntityKind::Result),
];

const RESULT_CHILDREN: &[ChildKey] = &[child(&["indicators"], EntityKind::ResultIndicator)];

const INDICATOR_CHILDREN: &[ChildKey] = &[
    child(&["periods"], EntityKind::IndicatorPeriod),
    child(&["references"], EntityKind::IndicatorReference),
];

const PERIOD_CHILDREN: &[ChildKey] = &[
    child(&["target", "location"], EntityKind::IndicatorTargetLocation),
    child(&["target", "dimension"], EntityKind::IndicatorTargetDimension),
    child(&["actual", "location"], EntityKind::IndicatorActualLocation),
    child(&["actual", "dimension"], EntityKind::IndicatorActualDimension),
];

/// Embedded child fields of `kind`.
pub fn child_keys(kind: EntityKind) -> &'static [ChildKey] {
    match kind {
        EntityKind::Activity => ACTIVITY_CHILDREN,
        EntityKind::Result => RESULT_CHILDREN,
        EntityKind::ResultIndicator => INDICATOR_CHILDREN,
        EntityKind::IndicatorPeriod => PERIOD_CHILDREN,
        _ => &[],
    }
}

pub fn normalize(schema: ResponseSchema, body: &Value) -> Result<NormalizedResponse, NormalizeError> {
    let mut entities = Entities::new();
    let result = match schema {
        ResponseSchema::One(kind) => {
            if !body.is_object() {
                return Err(NormalizeError::ExpectedObject {
                    kind,
                    found: type_name(body),
                });
            }
            NormalizedResult::One(normalize_record(kind, body.clone(), &mut entities))
        }
        ResponseSchema::Many(kind) => {
            let Value::Array(records) = body else {
                return Err(NormalizeError::ExpectedArray {
                    kind,
                    found: type_name(body),
                });
            };
            NormalizedResult::Many(normalize_records(kind, records, &mut entities))
        }
        ResponseSchema::Page(kind) => {
            let Some(Value::Array(records)) = body.get("results") else {
                return Err(NormalizeError::MissingResults { kind });
            };
            NormalizedResult::Page {
                count: body.get("count").and_then(Value::as_u64),
                next: body.get("next").and_then(Value::as_str).map(str::to_string),
                ids: normalize_records(kind, records, &mut entities),
            }
        }
    };
    Ok(NormalizedResponse { entities, result })
}

fn normalize_records(kind: EntityKind, records: &[Value], entities: &mut Entities) -> Vec<RecordId> {
    records
        .iter()
        .filter_map(|record| normalize_record(kind, record.clone(), entities))
        .collect()
}

/// Lifts `record` and its embedded children into `entities`; returns its id when it has one.
fn normalize_record(kind: EntityKind, mut record: Value, entities: &mut Entities) -> Option<RecordId> {
    for key in child_keys(kind) {
        if let Some(slot) = lookup_mut(&mut record, key.path) {
            lift_children(key.kind, slot, entities);
        }
    }

    let Some(id) = record_id(&record) else {
        debug!(%kind, "response record without id left out of the store");
        return None;
    };
    entities.entry(kind).or_default().insert(id, record);
    Some(id)
}

fn lift_children(kind: EntityKind, slot: &mut Value, entities: &mut Entities) {
    match slot {
        Value::Array(children) => {
            for child in children.iter_mut() {
                if !child.is_object() {
                    continue;
                }
                if let Some(id) = normalize_record(kind, child.clone(), entities) {
                    *child = Value::from(id.0);
                }
            }
        }
        Value::Object(_) => {
            if let Some(id) = normalize_record(kind, slot.clone(), entities) {
                *slot = Value::from(id.0);
            }
        }
        _ => {}
    }
}

fn lookup_mut<'a>(value: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    path.iter().try_fold(value, |current, key| current.get_mut(*key))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
