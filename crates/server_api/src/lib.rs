//! Passthrough from the proxy's routes to the remote OIPA activity API.
//!
//! Reads go to the read host, creates and updates to the write host, deletes to the delete host.

pub mod paths;

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method};
use serde_json::Value;
use shared::{
    domain::{ActivityId, EntityKind, ParentPath},
    error::{ApiError, ErrorCode},
    protocol::{Access, ActivityOperation, CodeListItem, CrudOperation, Endpoint},
};
use tracing::{debug, warn};
use url::Url;

pub use paths::PathTemplates;

#[derive(Debug, Clone)]
pub struct OipaConfig {
    pub read_url: Url,
    pub write_url: Url,
    pub delete_url: Url,
    pub paths: PathTemplates,
}

impl OipaConfig {
    pub fn new(read_url: Url, write_url: Url, delete_url: Url) -> Self {
        Self {
            read_url,
            write_url,
            delete_url,
            paths: PathTemplates::default(),
        }
    }

    fn host(&self, access: Access) -> &Url {
        match access {
            Access::Read => &self.read_url,
            Access::Write => &self.write_url,
            Access::Delete => &self.delete_url,
        }
    }
}

#[derive(Clone)]
pub struct ApiContext {
    pub http: Client,
    pub oipa: Arc<OipaConfig>,
}

impl ApiContext {
    pub fn new(oipa: OipaConfig, request_timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::new(ErrorCode::Internal, format!("http client: {e}")))?;
        Ok(Self {
            http,
            oipa: Arc::new(oipa),
        })
    }
}

/// Who the call is made for. The token, when present, is forwarded upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub token: Option<String>,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Accepts `Token <key>` (and, leniently, a bare key).
    pub fn from_authorization(header: Option<&str>) -> Self {
        let token = header
            .map(str::trim)
            .map(|value| value.strip_prefix("Token ").unwrap_or(value).trim())
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        Self { token }
    }
}

pub async fn add_activity(ctx: &ApiContext, user: &UserContext, form: &Value) -> Result<Value, ApiError> {
    let path = ctx.oipa.paths.activities.clone();
    send(ctx, user, Method::POST, Access::Write, &path, &[], Some(form)).await
}

/// Posts the description block of the basic information step. The form names its activity.
pub async fn add_basic_information(
    ctx: &ApiContext,
    user: &UserContext,
    form: &Value,
) -> Result<Value, ApiError> {
    let activity = form
        .get("activity")
        .and_then(as_id)
        .ok_or_else(|| ApiError::new(ErrorCode::Validation, "form has no activity id"))?;
    let path = ctx
        .oipa
        .paths
        .activity_collection(EntityKind::Description, ActivityId(activity))?;
    send(ctx, user, Method::POST, Access::Write, &path, &[], Some(form)).await
}

pub async fn add_participating_organisation(
    ctx: &ApiContext,
    user: &UserContext,
    form: &Value,
    activity: ActivityId,
) -> Result<Value, ApiError> {
    let path = ctx
        .oipa
        .paths
        .activity_collection(EntityKind::ParticipatingOrganisation, activity)?;
    send(ctx, user, Method::POST, Access::Write, &path, &[], Some(form)).await
}

pub async fn get_code_list_items(
    ctx: &ApiContext,
    user: &UserContext,
    code_list: &str,
) -> Result<Vec<CodeListItem>, ApiError> {
    let path = ctx.oipa.paths.code_list(code_list);
    let body = send(ctx, user, Method::GET, Access::Read, &path, &[], None).await?;
    let items = match body {
        Value::Object(mut page) => page.remove("results").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(items)
        .map_err(|e| ApiError::new(ErrorCode::Transport, format!("unreadable code list: {e}")))
}

/// Routes one named remote procedure onto the REST API.
///
/// `args` is the positional tuple the client built: publisher, ancestor ids, then the record id
/// and/or the JSON payload depending on the operation.
pub async fn call(
    ctx: &ApiContext,
    user: &UserContext,
    endpoint: &Endpoint,
    args: &[Value],
) -> Result<Value, ApiError> {
    let paths = &ctx.oipa.paths;
    let access = endpoint.access();
    match *endpoint {
        Endpoint::Crud {
            operation,
            kind: EntityKind::Activity,
        } => {
            expect_args(endpoint, args, 2)?;
            match operation {
                CrudOperation::Get => {
                    let path = paths.activity(int_arg(args, 1)?);
                    send(ctx, user, Method::GET, access, &path, &[], None).await
                }
                CrudOperation::Create => {
                    let payload = payload_arg(&args[1])?;
                    send(ctx, user, Method::POST, access, &paths.activities, &[], Some(&payload)).await
                }
                CrudOperation::Update => {
                    let payload = payload_arg(&args[1])?;
                    let id = payload.get("id").and_then(as_id).ok_or_else(|| {
                        ApiError::new(ErrorCode::Validation, "activity payload has no id")
                    })?;
                    send(ctx, user, Method::PUT, access, &paths.activity(id), &[], Some(&payload)).await
                }
                CrudOperation::Delete => {
                    let path = paths.activity(int_arg(args, 1)?);
                    send(ctx, user, Method::DELETE, access, &path, &[], None).await
                }
            }
        }
        Endpoint::Crud { operation, kind } => {
            let depth = match operation {
                CrudOperation::Get => kind.read_depth(),
                _ => kind.mutation_depth(),
            };
            let ancestors = depth.arity();
            let extra = match operation {
                CrudOperation::Get => 0,
                CrudOperation::Create | CrudOperation::Delete => 1,
                CrudOperation::Update => 2,
            };
            expect_args(endpoint, args, ancestors + extra)?;
            let parent = parent_path(args, ancestors)?;
            match operation {
                CrudOperation::Get => {
                    let path = paths.read(kind, &parent)?;
                    send(ctx, user, Method::GET, access, &path, &[], None).await
                }
                CrudOperation::Create => {
                    let path = paths.collection(kind, &parent)?;
                    let payload = payload_arg(&args[ancestors])?;
                    send(ctx, user, Method::POST, access, &path, &[], Some(&payload)).await
                }
                CrudOperation::Update => {
                    let path = paths.item(kind, &parent, int_arg(args, ancestors)?)?;
                    let payload = payload_arg(&args[ancestors + 1])?;
                    send(ctx, user, Method::PUT, access, &path, &[], Some(&payload)).await
                }
                CrudOperation::Delete => {
                    let path = paths.item(kind, &parent, int_arg(args, ancestors)?)?;
                    send(ctx, user, Method::DELETE, access, &path, &[], None).await
                }
            }
        }
        Endpoint::Activity { operation } => {
            call_activity_operation(ctx, user, endpoint, operation, args).await
        }
    }
}

async fn call_activity_operation(
    ctx: &ApiContext,
    user: &UserContext,
    endpoint: &Endpoint,
    operation: ActivityOperation,
    args: &[Value],
) -> Result<Value, ApiError> {
    let paths = &ctx.oipa.paths;
    let access = endpoint.access();
    match operation {
        ActivityOperation::GetAll => {
            if args.is_empty() || args.len() > 3 {
                return Err(arity_error(endpoint, 3, args.len()));
            }
            let mut query = vec![("publisher".to_string(), int_arg(args, 0)?.to_string())];
            if let Some(Value::Object(filters)) = args.get(1) {
                for (key, value) in filters {
                    match value {
                        Value::Null => {}
                        Value::String(text) => query.push((key.clone(), text.clone())),
                        other => query.push((key.clone(), other.to_string())),
                    }
                }
            }
            if args.get(2).is_some_and(|page| !page.is_null()) {
                query.push(("page".to_string(), int_arg(args, 2)?.to_string()));
            }
            send(ctx, user, Method::GET, access, &paths.activities, &query, None).await
        }
        ActivityOperation::GetModified | ActivityOperation::GetReadyToPublish => {
            expect_args(endpoint, args, 1)?;
            let flag = match operation {
                ActivityOperation::GetModified => "modified",
                _ => "ready_to_publish",
            };
            let query = [
                ("publisher".to_string(), int_arg(args, 0)?.to_string()),
                (flag.to_string(), "true".to_string()),
            ];
            send(ctx, user, Method::GET, access, &paths.activities, &query, None).await
        }
        ActivityOperation::MarkReadyToPublish => {
            expect_args(endpoint, args, 2)?;
            let path = format!("{}mark_ready_to_publish/", paths.activity(int_arg(args, 1)?));
            send(ctx, user, Method::POST, access, &path, &[], None).await
        }
        ActivityOperation::GetCodeListItems => {
            expect_args(endpoint, args, 1)?;
            let code_list = args[0]
                .as_str()
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| ApiError::new(ErrorCode::Validation, "code list name must be a string"))?;
            send(ctx, user, Method::GET, access, &paths.code_list(code_list), &[], None).await
        }
    }
}

async fn send(
    ctx: &ApiContext,
    user: &UserContext,
    method: Method,
    access: Access,
    path: &str,
    query: &[(String, String)],
    body: Option<&Value>,
) -> Result<Value, ApiError> {
    let base = ctx.oipa.host(access).as_str().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}{path}"))
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("invalid upstream url: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    debug!(%method, %url, "upstream call");

    let mut request = ctx.http.request(method.clone(), url.clone());
    if let Some(token) = &user.token {
        request = request.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
    }
    if let Some(body) = body {
        request = request.json(body);
    }
    let response = request.send().await.map_err(|e| {
        warn!(%method, %url, error = %e, "upstream unreachable");
        ApiError::new(ErrorCode::Transport, e.to_string())
    })?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::new(ErrorCode::Transport, e.to_string()))?;
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    if status.is_success() {
        return Ok(parsed);
    }
    warn!(%method, %url, status = status.as_u16(), "upstream rejected call");
    let error = ApiError::new(
        ErrorCode::from_status(status.as_u16()),
        format!("upstream responded with {status}"),
    );
    Err(match parsed {
        Value::Null => error,
        details => error.with_details(details),
    })
}

fn expect_args(endpoint: &Endpoint, args: &[Value], expected: usize) -> Result<(), ApiError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(arity_error(endpoint, expected, args.len()))
    }
}

fn arity_error(endpoint: &Endpoint, expected: usize, actual: usize) -> ApiError {
    ApiError::new(
        ErrorCode::Validation,
        format!("{endpoint} takes {expected} arguments, got {actual}"),
    )
}

fn parent_path(args: &[Value], ancestors: usize) -> Result<ParentPath, ApiError> {
    let ids = (0..ancestors)
        .map(|index| int_arg(args, index))
        .collect::<Result<Vec<_>, _>>()?;
    ParentPath::from_ids(&ids)
        .ok_or_else(|| ApiError::new(ErrorCode::Validation, "argument list has no publisher id"))
}

fn int_arg(args: &[Value], index: usize) -> Result<i64, ApiError> {
    args.get(index).and_then(as_id).ok_or_else(|| {
        ApiError::new(
            ErrorCode::Validation,
            format!("argument {index} must be an integer id"),
        )
    })
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(id) => id.as_i64(),
        Value::String(id) => id.trim().parse().ok(),
        _ => None,
    }
}

/// Payloads arrive as JSON text; an inline object is accepted too.
fn payload_arg(value: &Value) -> Result<Value, ApiError> {
    let payload = match value {
        Value::String(text) => serde_json::from_str(text).map_err(|e| {
            ApiError::new(ErrorCode::Validation, format!("payload is not valid JSON: {e}"))
        })?,
        other => other.clone(),
    };
    if payload.is_object() {
        Ok(payload)
    } else {
        Err(ApiError::new(ErrorCode::Validation, "payload must be a JSON object"))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
