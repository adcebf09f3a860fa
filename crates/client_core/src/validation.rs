//! Field-level checks run before a submission reaches the network.

use std::{collections::BTreeMap, fmt};

use serde_json::Value;
use shared::domain::EntityKind;
use thiserror::Error;

pub const REQUIRED: &str = "Required";

/// Messages keyed by field path, e.g. `sectors[1].percentage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.fields.get(path).map(String::as_str)
    }

    fn push(&mut self, path: String, message: impl Into<String>) {
        self.fields.entry(path).or_insert_with(|| message.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s)", self.fields.len())?;
        for (path, message) in &self.fields {
            write!(f, "; {path}: {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Required(&'static [&'static str]),
    /// Optional unless `required`; when present it must parse as a number inside the bounds.
    Number {
        path: &'static [&'static str],
        required: bool,
        min: Option<f64>,
        max: Option<f64>,
    },
}

const HUMANITARIAN_SCOPE_RULES: &[Rule] = &[
    Rule::Required(&["type", "code"]),
    Rule::Required(&["vocabulary", "code"]),
    Rule::Required(&["code"]),
];

const SECTOR_RULES: &[Rule] = &[
    Rule::Required(&["sector", "code"]),
    Rule::Required(&["vocabulary", "code"]),
    Rule::Number {
        path: &["percentage"],
        required: false,
        min: Some(0.0),
        max: Some(100.0),
    },
];

const PARTICIPATING_ORGANISATION_RULES: &[Rule] = &[
    Rule::Required(&["role", "code"]),
    Rule::Required(&["type", "code"]),
    Rule::Required(&["ref"]),
];

const LOCATION_RULES: &[Rule] = &[Rule::Required(&["feature_designation", "code"])];

const DESCRIPTION_RULES: &[Rule] = &[Rule::Required(&["type", "code"])];

const BUDGET_RULES: &[Rule] = &[Rule::Number {
    path: &["value", "value"],
    required: true,
    min: None,
    max: None,
}];

const TRANSACTION_RULES: &[Rule] = &[Rule::Number {
    path: &["value"],
    required: true,
    min: None,
    max: None,
}];

fn rules(kind: EntityKind) -> &'static [Rule] {
    match kind {
        EntityKind::HumanitarianScope => HUMANITARIAN_SCOPE_RULES,
        EntityKind::Sector => SECTOR_RULES,
        EntityKind::ParticipatingOrganisation => PARTICIPATING_ORGANISATION_RULES,
        EntityKind::Location => LOCATION_RULES,
        EntityKind::Description => DESCRIPTION_RULES,
        EntityKind::Budget => BUDGET_RULES,
        EntityKind::Transaction => TRANSACTION_RULES,
        _ => &[],
    }
}

/// Checks every submitted record of `kind`. Kinds without rules always pass.
pub fn validate(kind: EntityKind, records: &[Value]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for (index, record) in records.iter().enumerate() {
        for rule in rules(kind) {
            check(kind, index, record, *rule, &mut errors);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check(kind: EntityKind, index: usize, record: &Value, rule: Rule, errors: &mut ValidationErrors) {
    match rule {
        Rule::Required(path) => {
            if !is_filled(lookup(record, path)) {
                errors.push(field_path(kind, index, path), REQUIRED);
            }
        }
        Rule::Number {
            path,
            required,
            min,
            max,
        } => {
            let value = lookup(record, path);
            if !is_filled(value) {
                if required {
                    errors.push(field_path(kind, index, path), REQUIRED);
                }
                return;
            }
            let Some(number) = value.and_then(as_number) else {
                errors.push(field_path(kind, index, path), "Must be a number");
                return;
            };
            let below = min.is_some_and(|min| number < min);
            let above = max.is_some_and(|max| number > max);
            if below || above {
                errors.push(field_path(kind, index, path), range_message(min, max));
            }
        }
    }
}

fn lookup<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(record, |current, key| current.get(*key))
}

fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(_) => true,
    }
}

/// `NaN` and infinities parse as `f64` but are never accepted as numbers.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn range_message(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("Must be between {min} and {max}"),
        (Some(min), None) => format!("Must be at least {min}"),
        (None, Some(max)) => format!("Must be at most {max}"),
        (None, None) => "Out of range".to_string(),
    }
}

fn field_path(kind: EntityKind, index: usize, path: &[&str]) -> String {
    format!("{kind}[{index}].{}", path.join("."))
}
