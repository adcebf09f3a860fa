//! Request descriptors for every remote procedure, and the actions their outcomes produce.

use std::fmt;

use serde_json::{Map, Value};
use shared::{
    domain::{ActivityId, Depth, EntityKind, ParentPath, PublisherId, RecordId},
    error::ApiError,
    protocol::{ActivityOperation, CodeListItem, CrudOperation, Endpoint},
};

use crate::{
    error::DispatchError,
    normalize::NormalizedResponse,
    payload::{carries_activity_id, inject_activity_into_nested, record_id, strip_nulls, to_argument},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Request,
    Success,
    Failure,
}

/// `CREATE_SECTOR_SUCCESS` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionType {
    pub endpoint: Endpoint,
    pub phase: Phase,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Request => "REQUEST",
            Phase::Success => "SUCCESS",
            Phase::Failure => "FAILURE",
        };
        write!(f, "{}_{phase}", self.endpoint.action_name())
    }
}

/// Expected shape of a response body, used to flatten it into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    One(EntityKind),
    Many(EntityKind),
    /// `{ count, next, previous, results: [...] }`
    Page(EntityKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub endpoint: Endpoint,
    pub args: Vec<Value>,
    pub schema: Option<ResponseSchema>,
    /// Record the call is about, carried through to the success action (deletes rely on it).
    pub target: Option<RecordId>,
    /// Opaque tag echoed back on success, e.g. the code list name.
    pub extra: Option<String>,
}

impl RequestDescriptor {
    fn new(endpoint: Endpoint, args: Vec<Value>) -> Self {
        Self {
            endpoint,
            args,
            schema: None,
            target: None,
            extra: None,
        }
    }

    fn schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    fn target(mut self, id: RecordId) -> Self {
        self.target = Some(id);
        self
    }

    pub fn endpoint_name(&self) -> String {
        self.endpoint.name()
    }

    pub fn request_kind(&self) -> ActionType {
        self.action_type(Phase::Request)
    }

    pub fn success_kind(&self) -> ActionType {
        self.action_type(Phase::Success)
    }

    pub fn failure_kind(&self) -> ActionType {
        self.action_type(Phase::Failure)
    }

    fn action_type(&self, phase: Phase) -> ActionType {
        ActionType {
            endpoint: self.endpoint,
            phase,
        }
    }
}

/// Result of one dispatched descriptor, folded into the session state by the reducers.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Request {
        action_type: ActionType,
        target: Option<RecordId>,
    },
    Success {
        action_type: ActionType,
        target: Option<RecordId>,
        outcome: Outcome,
    },
    Failure {
        action_type: ActionType,
        target: Option<RecordId>,
        error: ApiError,
    },
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Request { action_type, .. }
            | Action::Success { action_type, .. }
            | Action::Failure { action_type, .. } => *action_type,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Action::Failure { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Normalized(NormalizedResponse),
    Deleted { kind: EntityKind, id: RecordId },
    CodeList { name: String, items: Vec<CodeListItem> },
    /// Response without a declared schema; the store ignores it.
    Raw(Value),
}

pub fn get_activities(publisher: PublisherId, filters: Value, page: u32) -> RequestDescriptor {
    RequestDescriptor::new(
        Endpoint::activity(ActivityOperation::GetAll),
        vec![Value::from(publisher.0), filters, Value::from(page)],
    )
    .schema(ResponseSchema::Page(EntityKind::Activity))
}

pub fn get_modified_activities(publisher: PublisherId) -> RequestDescriptor {
    RequestDescriptor::new(
        Endpoint::activity(ActivityOperation::GetModified),
        vec![Value::from(publisher.0)],
    )
}

pub fn get_ready_to_publish_activities(publisher: PublisherId) -> RequestDescriptor {
    RequestDescriptor::new(
        Endpoint::activity(ActivityOperation::GetReadyToPublish),
        vec![Value::from(publisher.0)],
    )
}

pub fn mark_ready_to_publish(publisher: PublisherId, activity: ActivityId) -> RequestDescriptor {
    RequestDescriptor::new(
        Endpoint::activity(ActivityOperation::MarkReadyToPublish),
        vec![Value::from(publisher.0), Value::from(activity.0)],
    )
    .target(RecordId(activity.0))
}

pub fn get_code_list_items(code_list: &str) -> RequestDescriptor {
    let mut descriptor = RequestDescriptor::new(
        Endpoint::activity(ActivityOperation::GetCodeListItems),
        vec![Value::from(code_list)],
    );
    descriptor.extra = Some(code_list.to_string());
    descriptor
}

pub fn get_activity(publisher: PublisherId, activity: ActivityId) -> RequestDescriptor {
    RequestDescriptor::new(
        Endpoint::crud(CrudOperation::Get, EntityKind::Activity),
        vec![Value::from(publisher.0), Value::from(activity.0)],
    )
    .schema(ResponseSchema::One(EntityKind::Activity))
}

pub fn create_activity(
    publisher: PublisherId,
    activity: Value,
) -> Result<RequestDescriptor, DispatchError> {
    let fields = strip_nulls(into_object(EntityKind::Activity, activity)?);
    Ok(RequestDescriptor::new(
        Endpoint::crud(CrudOperation::Create, EntityKind::Activity),
        vec![Value::from(publisher.0), to_argument(&fields)],
    )
    .schema(ResponseSchema::One(EntityKind::Activity)))
}

/// The activity id travels inside the payload; legacy data and country budget items get it too.
pub fn update_activity(
    publisher: PublisherId,
    activity: Value,
) -> Result<RequestDescriptor, DispatchError> {
    let id = record_id(&activity).ok_or(DispatchError::MissingId {
        kind: EntityKind::Activity,
    })?;
    let mut fields = strip_nulls(into_object(EntityKind::Activity, activity)?);
    inject_activity_into_nested(&mut fields, id.0);
    Ok(RequestDescriptor::new(
        Endpoint::crud(CrudOperation::Update, EntityKind::Activity),
        vec![Value::from(publisher.0), to_argument(&fields)],
    )
    .schema(ResponseSchema::One(EntityKind::Activity))
    .target(id))
}

pub fn delete_activity(publisher: PublisherId, activity: ActivityId) -> RequestDescriptor {
    RequestDescriptor::new(
        Endpoint::crud(CrudOperation::Delete, EntityKind::Activity),
        vec![Value::from(publisher.0), Value::from(activity.0)],
    )
    .target(RecordId(activity.0))
}

/// Reads the collection of `kind` under `path`.
pub fn get(kind: EntityKind, path: &ParentPath) -> Result<RequestDescriptor, DispatchError> {
    let endpoint = Endpoint::crud(CrudOperation::Get, kind);
    if kind == EntityKind::Activity {
        let activity = path.activity.ok_or_else(|| missing(&endpoint, kind, path))?;
        return Ok(get_activity(path.publisher, activity));
    }
    let args = ancestor_args(&endpoint, kind.read_depth(), path)?;
    Ok(RequestDescriptor::new(endpoint, args).schema(ResponseSchema::Many(kind)))
}

pub fn create(
    kind: EntityKind,
    path: &ParentPath,
    payload: Value,
) -> Result<RequestDescriptor, DispatchError> {
    if kind == EntityKind::Activity {
        return create_activity(path.publisher, payload);
    }
    let endpoint = Endpoint::crud(CrudOperation::Create, kind);
    let mut args = ancestor_args(&endpoint, kind.mutation_depth(), path)?;
    let fields = child_fields(kind, path, payload)?;
    args.push(to_argument(&fields));
    Ok(RequestDescriptor::new(endpoint, args).schema(ResponseSchema::One(kind)))
}

pub fn update(
    kind: EntityKind,
    path: &ParentPath,
    id: RecordId,
    payload: Value,
) -> Result<RequestDescriptor, DispatchError> {
    if kind == EntityKind::Activity {
        let mut fields = into_object(kind, payload)?;
        fields.insert("id".to_string(), Value::from(id.0));
        return update_activity(path.publisher, Value::Object(fields));
    }
    let endpoint = Endpoint::crud(CrudOperation::Update, kind);
    let mut args = ancestor_args(&endpoint, kind.mutation_depth(), path)?;
    let fields = child_fields(kind, path, payload)?;
    args.push(Value::from(id.0));
    args.push(to_argument(&fields));
    Ok(RequestDescriptor::new(endpoint, args)
        .schema(ResponseSchema::One(kind))
        .target(id))
}

pub fn delete(
    kind: EntityKind,
    path: &ParentPath,
    id: RecordId,
) -> Result<RequestDescriptor, DispatchError> {
    if kind == EntityKind::Activity {
        return Ok(delete_activity(path.publisher, ActivityId(id.0)));
    }
    let endpoint = Endpoint::crud(CrudOperation::Delete, kind);
    let mut args = ancestor_args(&endpoint, kind.mutation_depth(), path)?;
    args.push(Value::from(id.0));
    Ok(RequestDescriptor::new(endpoint, args).target(id))
}

fn ancestor_args(
    endpoint: &Endpoint,
    depth: Depth,
    path: &ParentPath,
) -> Result<Vec<Value>, DispatchError> {
    let ids = path.ids_to(depth).ok_or_else(|| DispatchError::MissingAncestors {
        endpoint: endpoint.name(),
        required: depth,
        actual: path.depth(),
    })?;
    Ok(ids.into_iter().map(Value::from).collect())
}

fn missing(endpoint: &Endpoint, kind: EntityKind, path: &ParentPath) -> DispatchError {
    DispatchError::MissingAncestors {
        endpoint: endpoint.name(),
        required: kind.read_depth(),
        actual: path.depth(),
    }
}

fn child_fields(
    kind: EntityKind,
    path: &ParentPath,
    payload: Value,
) -> Result<Map<String, Value>, DispatchError> {
    let mut fields = strip_nulls(into_object(kind, payload)?);
    if carries_activity_id(kind) {
        if let Some(activity) = path.activity {
            fields.insert("activity".to_string(), Value::from(activity.0));
        }
    }
    Ok(fields)
}

fn into_object(kind: EntityKind, payload: Value) -> Result<Map<String, Value>, DispatchError> {
    match payload {
        Value::Object(fields) => Ok(fields),
        _ => Err(DispatchError::NotAnObject { kind }),
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
