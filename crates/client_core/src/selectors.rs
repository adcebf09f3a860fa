//! Array projections of the normalized store, recomputed only when their source table changes.

use std::sync::Arc;

use serde_json::Value;
use shared::domain::{Depth, EntityKind, ParentPath, RecordId};

use crate::{normalize::EntityTable, payload::parse_id, store::NormalizedStore};

pub struct CollectionSelector {
    kind: EntityKind,
    memo: Option<(Option<Arc<EntityTable>>, Arc<[Value]>)>,
}

impl CollectionSelector {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind, memo: None }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn select(&mut self, state: &NormalizedStore) -> Arc<[Value]> {
        let source = state.table(self.kind).cloned();
        if let Some((cached_source, cached)) = &self.memo {
            let unchanged = match (cached_source, &source) {
                (Some(cached_source), Some(source)) => Arc::ptr_eq(cached_source, source),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return Arc::clone(cached);
            }
        }
        let projected: Arc<[Value]> = match &source {
            Some(table) => table.values().cloned().collect(),
            None => Arc::from(Vec::new()),
        };
        self.memo = Some((source, Arc::clone(&projected)));
        projected
    }
}

/// Un-memoized projection of one table.
pub fn select_all(state: &NormalizedStore, kind: EntityKind) -> Vec<Value> {
    state
        .table(kind)
        .map(|table| table.values().cloned().collect())
        .unwrap_or_default()
}

/// Records of `kind` whose `parent_field` points at `parent`.
pub fn select_children(
    state: &NormalizedStore,
    kind: EntityKind,
    parent_field: &str,
    parent: RecordId,
) -> Vec<Value> {
    select_all(state, kind)
        .into_iter()
        .filter(|record| {
            record.get(parent_field).and_then(parse_id) == Some(parent)
        })
        .collect()
}

/// Records of `kind` that a form at `path` edits.
///
/// Kinds read per indicator but written per period are narrowed to the period of `path`, so
/// records of sibling periods never reach a reconciliation under the wrong period.
pub fn select_for_path(state: &NormalizedStore, kind: EntityKind, path: &ParentPath) -> Vec<Value> {
    match path.period {
        Some(period) if kind.read_depth() < Depth::Period && kind.mutation_depth() == Depth::Period => {
            select_children(state, kind, "period", RecordId(period.0))
        }
        _ => select_all(state, kind),
    }
}
