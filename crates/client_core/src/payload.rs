//! Shaping of create/update payloads before they are serialized into an argument tuple.

use serde_json::{Map, Value};
use shared::domain::{EntityKind, RecordId};

/// Activity fields whose nested records must carry the parent activity id.
const LEGACY_DATA_FIELD: &str = "legacy_data";
const COUNTRY_BUDGET_ITEMS_FIELD: &str = "country_budget_items";
const ACTIVITY_FIELD: &str = "activity";

/// Reads a record's server-assigned id, accepting integers and numeric strings.
pub fn record_id(record: &Value) -> Option<RecordId> {
    record.get("id").and_then(parse_id)
}

/// Parses an id-valued field such as `id` or a foreign key.
pub fn parse_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(id) => id.as_i64().map(RecordId),
        Value::String(id) => id.trim().parse().ok().map(RecordId),
        _ => None,
    }
}

/// Drops top-level fields whose value is `null`. Nested values are left alone.
pub fn strip_nulls(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect()
}

/// Stamps `activity` onto every legacy-data entry and onto the country budget items block.
pub fn inject_activity_into_nested(fields: &mut Map<String, Value>, activity: i64) {
    if let Some(Value::Array(entries)) = fields.get_mut(LEGACY_DATA_FIELD) {
        for entry in entries.iter_mut() {
            if let Value::Object(entry) = entry {
                entry.insert(ACTIVITY_FIELD.to_string(), Value::from(activity));
            }
        }
    }
    if let Some(Value::Object(items)) = fields.get_mut(COUNTRY_BUDGET_ITEMS_FIELD) {
        items.insert(ACTIVITY_FIELD.to_string(), Value::from(activity));
    }
}

/// Kinds whose own records are posted with the parent activity id inline.
pub fn carries_activity_id(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::LegacyData | EntityKind::CountryBudgetItem)
}

/// Serializes a payload the way the remote procedures expect it: a JSON string, key order kept.
pub fn to_argument(fields: &Map<String, Value>) -> Value {
    Value::String(Value::Object(fields.clone()).to_string())
}
