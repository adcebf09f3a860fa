//! The normalized entity store and the reducer that is its only writer.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;
use shared::domain::{EntityKind, RecordId};

use crate::{
    actions::{Action, Outcome},
    normalize::{Entities, EntityTable},
};

/// Entity kind -> id -> record. Tables are shared so untouched ones keep their identity
/// across reductions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedStore {
    tables: BTreeMap<EntityKind, Arc<EntityTable>>,
}

impl NormalizedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, kind: EntityKind) -> Option<&Arc<EntityTable>> {
        self.tables.get(&kind)
    }

    pub fn get(&self, kind: EntityKind, id: RecordId) -> Option<&Value> {
        self.tables.get(&kind)?.get(&id)
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map_or(0, |table| table.len())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|table| table.is_empty())
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.tables.keys().copied()
    }

    fn merge(&self, entities: &Entities) -> Self {
        let mut next = self.clone();
        for (kind, incoming) in entities {
            let current = self.tables.get(kind);
            let mut merged = current.map(|table| (**table).clone()).unwrap_or_default();
            for (id, record) in incoming {
                match merged.get_mut(id) {
                    Some(existing) => deep_merge(existing, record),
                    None => {
                        merged.insert(*id, record.clone());
                    }
                }
            }
            if current.is_some_and(|table| **table == merged) {
                continue;
            }
            next.tables.insert(*kind, Arc::new(merged));
        }
        next
    }

    fn remove(&self, kind: EntityKind, id: RecordId) -> Self {
        let mut next = self.clone();
        let Some(table) = self.tables.get(&kind) else {
            return next;
        };
        if !table.contains_key(&id) {
            return next;
        }
        let mut pruned = (**table).clone();
        pruned.remove(&id);
        next.tables.insert(kind, Arc::new(pruned));
        next
    }
}

/// Folds one action into the store. Pure: `state` is never mutated and every table the action
/// does not touch is shared with the returned store.
pub fn reduce(state: &NormalizedStore, action: &Action) -> NormalizedStore {
    match action {
        Action::Success { outcome, .. } => match outcome {
            Outcome::Normalized(response) => state.merge(&response.entities),
            Outcome::Deleted { kind, id } => state.remove(*kind, *id),
            Outcome::CodeList { .. } | Outcome::Raw(_) => state.clone(),
        },
        Action::Request { .. } | Action::Failure { .. } => state.clone(),
    }
}

/// Merges `source` into `target`: objects key by key, anything else replaced at the leaf.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
