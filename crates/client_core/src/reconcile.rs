//! Turns "what the server had" and "what the form now holds" into create/update/delete calls.

use std::collections::BTreeSet;

use futures::future::join_all;
use serde_json::Value;
use shared::{
    domain::{EntityKind, ParentPath, RecordId},
    error::{ApiError, ErrorCode},
};
use tracing::{info, warn};

use crate::{
    actions::{self, Action, Outcome, RequestDescriptor},
    error::DispatchError,
    normalize::NormalizedResult,
    payload::record_id,
    session::Dispatch,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub creates: Vec<Value>,
    pub updates: Vec<(RecordId, Value)>,
    pub deletes: Vec<RecordId>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }
}

/// Id-less submissions are created, every submission with an id is updated (changed or not),
/// and previously known ids missing from the submission are deleted.
pub fn plan(previous: &[Value], submitted: &[Value]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut kept = BTreeSet::new();
    for record in submitted {
        match record_id(record) {
            Some(id) => {
                kept.insert(id);
                plan.updates.push((id, record.clone()));
            }
            None => plan.creates.push(record.clone()),
        }
    }

    let mut seen = BTreeSet::new();
    for id in previous.iter().filter_map(record_id) {
        if !kept.contains(&id) && seen.insert(id) {
            plan.deletes.push(id);
        }
    }
    plan
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedOperation {
    Create,
    Update(RecordId),
    Delete(RecordId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub operation: PlannedOperation,
    /// Id of the affected record on success (server-assigned for creates).
    pub result: Result<Option<RecordId>, ApiError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub kind: EntityKind,
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchResult {
    pub fn is_failed(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.result.is_err())
    }

    /// First failure, in plan order.
    pub fn error(&self) -> Option<&ApiError> {
        self.outcomes
            .iter()
            .find_map(|outcome| outcome.result.as_ref().err())
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    pub fn created_ids(&self) -> Vec<RecordId> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.operation == PlannedOperation::Create)
            .filter_map(|outcome| outcome.result.as_ref().ok().copied().flatten())
            .collect()
    }
}

/// Issues every planned call concurrently and waits for all of them to settle.
///
/// Descriptors are built up front, so a path that cannot route the calls fails before anything
/// is sent. A failed call never cancels or rolls back its siblings.
pub async fn reconcile<D>(
    dispatcher: &D,
    kind: EntityKind,
    path: &ParentPath,
    previous: &[Value],
    submitted: &[Value],
) -> Result<BatchResult, DispatchError>
where
    D: Dispatch + ?Sized,
{
    let plan = plan(previous, submitted);
    let mut calls: Vec<(PlannedOperation, RequestDescriptor)> = Vec::with_capacity(plan.len());
    for record in plan.creates {
        calls.push((PlannedOperation::Create, actions::create(kind, path, record)?));
    }
    for (id, record) in plan.updates {
        calls.push((PlannedOperation::Update(id), actions::update(kind, path, id, record)?));
    }
    for id in plan.deletes {
        calls.push((PlannedOperation::Delete(id), actions::delete(kind, path, id)?));
    }

    let (operations, descriptors): (Vec<_>, Vec<_>) = calls.into_iter().unzip();
    let settled = join_all(
        descriptors
            .into_iter()
            .map(|descriptor| dispatcher.dispatch(descriptor)),
    )
    .await;

    let outcomes: Vec<OperationOutcome> = operations
        .into_iter()
        .zip(settled)
        .map(|(operation, action)| OperationOutcome {
            operation,
            result: settle(operation, action),
        })
        .collect();
    let batch = BatchResult { kind, outcomes };

    let failed = batch.failures().count();
    if failed > 0 {
        warn!(%kind, failed, total = batch.outcomes.len(), "reconciliation finished with failures");
    } else {
        info!(%kind, total = batch.outcomes.len(), "reconciliation finished");
    }
    Ok(batch)
}

fn settle(operation: PlannedOperation, action: Action) -> Result<Option<RecordId>, ApiError> {
    match action {
        Action::Success {
            outcome, target, ..
        } => Ok(match (operation, outcome) {
            (PlannedOperation::Create, Outcome::Normalized(response)) => match response.result {
                NormalizedResult::One(id) => id,
                _ => None,
            },
            _ => target,
        }),
        Action::Failure { error, .. } => Err(error),
        Action::Request { action_type, .. } => Err(ApiError::new(
            ErrorCode::Internal,
            format!("{action_type} never settled"),
        )),
    }
}
