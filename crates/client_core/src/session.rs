//! One editing session: every remote response is folded into the session's store here and
//! nowhere else.

use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{EntityKind, ParentPath},
    error::{ApiError, ErrorCode},
    protocol::{ActivityOperation, CodeListItem, CrudOperation, Endpoint},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::{
    actions::{self, Action, Outcome, RequestDescriptor},
    code_lists::{reduce_code_lists, CodeLists},
    error::{DispatchError, SubmitError},
    normalize::normalize,
    reconcile::{reconcile, BatchResult},
    store::{reduce, NormalizedStore},
    transport::ActivityApi,
    validation::validate,
};

/// Executes a descriptor and reports how it settled.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, descriptor: RequestDescriptor) -> Action;
}

pub struct Session<A: ActivityApi> {
    api: A,
    store: Mutex<NormalizedStore>,
    code_lists: Mutex<CodeLists>,
    events: broadcast::Sender<Action>,
}

impl<A: ActivityApi> Session<A> {
    pub fn new(api: A) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            api,
            store: Mutex::new(NormalizedStore::new()),
            code_lists: Mutex::new(CodeLists::new()),
            events,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Every request, success and failure action, in the order the session produced them.
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> NormalizedStore {
        self.store.lock().await.clone()
    }

    pub async fn code_lists(&self) -> CodeLists {
        self.code_lists.lock().await.clone()
    }

    /// Reads the collection of `kind` under `path` into the store.
    pub async fn fetch(&self, kind: EntityKind, path: &ParentPath) -> Result<Action, DispatchError> {
        Ok(self.dispatch(actions::get(kind, path)?).await)
    }

    /// Validates `submitted`, then reconciles it against `previous`.
    ///
    /// Nothing is sent when validation fails or when `path` cannot route the calls.
    pub async fn submit(
        &self,
        kind: EntityKind,
        path: &ParentPath,
        previous: &[Value],
        submitted: &[Value],
    ) -> Result<BatchResult, SubmitError> {
        validate(kind, submitted)?;
        Ok(reconcile(self, kind, path, previous, submitted).await?)
    }

    async fn apply(&self, action: &Action) {
        {
            let mut store = self.store.lock().await;
            let next = reduce(&store, action);
            *store = next;
        }
        let mut code_lists = self.code_lists.lock().await;
        let next = reduce_code_lists(&code_lists, action);
        *code_lists = next;
    }

    fn emit(&self, action: &Action) {
        let _ = self.events.send(action.clone());
    }
}

#[async_trait]
impl<A: ActivityApi> Dispatch for Session<A> {
    async fn dispatch(&self, descriptor: RequestDescriptor) -> Action {
        let target = descriptor.target;
        self.emit(&Action::Request {
            action_type: descriptor.request_kind(),
            target,
        });
        debug!(endpoint = %descriptor.endpoint, args = descriptor.args.len(), "dispatching");

        let settled = self
            .api
            .call(&descriptor.endpoint, &descriptor.args)
            .await
            .and_then(|body| outcome(&descriptor, body));
        let action = match settled {
            Ok(outcome) => Action::Success {
                action_type: descriptor.success_kind(),
                target,
                outcome,
            },
            Err(error) => {
                warn!(endpoint = %descriptor.endpoint, code = ?error.code, "{}", error.message);
                Action::Failure {
                    action_type: descriptor.failure_kind(),
                    target,
                    error,
                }
            }
        };

        self.apply(&action).await;
        self.emit(&action);
        action
    }
}

/// Interprets a success body according to what the descriptor asked for.
fn outcome(descriptor: &RequestDescriptor, body: Value) -> Result<Outcome, ApiError> {
    match descriptor.endpoint {
        Endpoint::Crud {
            operation: CrudOperation::Delete,
            kind,
        } => Ok(match descriptor.target {
            Some(id) => Outcome::Deleted { kind, id },
            None => Outcome::Raw(body),
        }),
        Endpoint::Activity {
            operation: ActivityOperation::GetCodeListItems,
        } => {
            let name = descriptor.extra.clone().unwrap_or_default();
            Ok(Outcome::CodeList {
                name,
                items: code_list_items(body)?,
            })
        }
        _ => match descriptor.schema {
            Some(schema) => normalize(schema, &body)
                .map(Outcome::Normalized)
                .map_err(|err| unreadable(err.to_string(), body)),
            None => Ok(Outcome::Raw(body)),
        },
    }
}

/// Accepts a bare list or a paginated `{ results: [...] }` body.
fn code_list_items(body: Value) -> Result<Vec<CodeListItem>, ApiError> {
    let list = match body {
        Value::Object(mut page) => page.remove("results").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(list.clone())
        .map_err(|err| unreadable(format!("code list items: {err}"), list))
}

fn unreadable(message: String, body: Value) -> ApiError {
    ApiError::new(ErrorCode::Transport, message).with_details(body)
}
