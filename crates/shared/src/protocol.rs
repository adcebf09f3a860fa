use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::EntityKind;

/// Namespace every remote procedure lives under.
pub const ENDPOINT_NAMESPACE: &str = "Activity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudOperation {
    Get,
    Create,
    Update,
    Delete,
}

impl CrudOperation {
    pub const ALL: [CrudOperation; 4] = [
        CrudOperation::Get,
        CrudOperation::Create,
        CrudOperation::Update,
        CrudOperation::Delete,
    ];

    fn verb(self) -> &'static str {
        match self {
            CrudOperation::Get => "get",
            CrudOperation::Create => "create",
            CrudOperation::Update => "update",
            CrudOperation::Delete => "delete",
        }
    }
}

/// Publisher-level procedures that do not follow the per-entity CRUD shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOperation {
    GetAll,
    GetModified,
    GetReadyToPublish,
    MarkReadyToPublish,
    GetCodeListItems,
}

impl ActivityOperation {
    pub const ALL: [ActivityOperation; 5] = [
        ActivityOperation::GetAll,
        ActivityOperation::GetModified,
        ActivityOperation::GetReadyToPublish,
        ActivityOperation::MarkReadyToPublish,
        ActivityOperation::GetCodeListItems,
    ];

    fn procedure(self) -> &'static str {
        match self {
            ActivityOperation::GetAll => "getAll",
            ActivityOperation::GetModified => "getModified",
            ActivityOperation::GetReadyToPublish => "getReadyToPublish",
            ActivityOperation::MarkReadyToPublish => "markReadyToPublish",
            ActivityOperation::GetCodeListItems => "getCodeListItems",
        }
    }

    fn action_name(self) -> &'static str {
        match self {
            ActivityOperation::GetAll => "GET_ACTIVITIES",
            ActivityOperation::GetModified => "GET_MODIFIED_ACTIVITIES",
            ActivityOperation::GetReadyToPublish => "GET_READY_TO_PUBLISH_ACTIVITIES",
            ActivityOperation::MarkReadyToPublish => "MARK_READY_TO_PUBLISH_ACTIVITY",
            ActivityOperation::GetCodeListItems => "GET_CODE_LIST_ITEMS",
        }
    }
}

/// Which remote host a procedure is forwarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Delete,
}

/// Singular spellings the remote surface also exposes; they resolve to the canonical endpoint.
const ENDPOINT_ALIASES: [(&str, Endpoint); 2] = [
    (
        "Activity.createPerformanceCondition",
        Endpoint::Crud {
            operation: CrudOperation::Create,
            kind: EntityKind::PerformanceCondition,
        },
    ),
    (
        "Activity.updatePerformanceCondition",
        Endpoint::Crud {
            operation: CrudOperation::Update,
            kind: EntityKind::PerformanceCondition,
        },
    ),
];

/// A named remote procedure, e.g. `Activity.createHumanitarianScope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Endpoint {
    Crud {
        operation: CrudOperation,
        kind: EntityKind,
    },
    Activity {
        operation: ActivityOperation,
    },
}

impl Endpoint {
    pub fn crud(operation: CrudOperation, kind: EntityKind) -> Self {
        Endpoint::Crud { operation, kind }
    }

    pub fn activity(operation: ActivityOperation) -> Self {
        Endpoint::Activity { operation }
    }

    pub fn all() -> impl Iterator<Item = Endpoint> {
        let crud = EntityKind::ALL.into_iter().flat_map(|kind| {
            CrudOperation::ALL
                .into_iter()
                .map(move |operation| Endpoint::crud(operation, kind))
        });
        crud.chain(ActivityOperation::ALL.into_iter().map(Endpoint::activity))
    }

    pub fn parse(name: &str) -> Option<Endpoint> {
        Self::all()
            .find(|endpoint| endpoint.name() == name)
            .or_else(|| {
                ENDPOINT_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, endpoint)| *endpoint)
            })
    }

    pub fn name(&self) -> String {
        let procedure = match *self {
            Endpoint::Crud {
                operation,
                kind: EntityKind::Activity,
            } => operation.verb().to_string(),
            Endpoint::Crud {
                operation: CrudOperation::Get,
                kind,
            } => format!("get{}", kind.get_stem()),
            Endpoint::Crud { operation, kind } => {
                format!("{}{}", operation.verb(), kind.endpoint_stem())
            }
            Endpoint::Activity { operation } => operation.procedure().to_string(),
        };
        format!("{ENDPOINT_NAMESPACE}.{procedure}")
    }

    /// SCREAMING_SNAKE stem shared by the request/success/failure action types.
    pub fn action_name(&self) -> String {
        match *self {
            Endpoint::Crud { operation, kind } => {
                format!("{}_{}", operation.verb().to_ascii_uppercase(), kind.action_name())
            }
            Endpoint::Activity { operation } => operation.action_name().to_string(),
        }
    }

    pub fn access(&self) -> Access {
        match *self {
            Endpoint::Crud {
                operation: CrudOperation::Get,
                ..
            } => Access::Read,
            Endpoint::Crud {
                operation: CrudOperation::Create | CrudOperation::Update,
                ..
            } => Access::Write,
            Endpoint::Crud {
                operation: CrudOperation::Delete,
                ..
            } => Access::Delete,
            Endpoint::Activity {
                operation: ActivityOperation::MarkReadyToPublish,
            } => Access::Write,
            Endpoint::Activity { .. } => Access::Read,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Body of a named remote procedure call forwarded through the proxy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub args: Vec<Value>,
}

/// One selectable entry of a server-provided code list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeListItem {
    #[serde(deserialize_with = "code_as_string")]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(code) => Ok(code),
        Value::Number(code) => Ok(code.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "code list item code must be a string or number, got {other}"
        ))),
    }
}
