//! Named remote procedure calls over HTTP, via the proxy server's `/rpc/{endpoint}` route.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{Endpoint, RpcRequest},
};
use tracing::{debug, warn};
use url::Url;

/// Something that can execute a named procedure with positional arguments.
#[async_trait]
pub trait ActivityApi: Send + Sync {
    async fn call(&self, endpoint: &Endpoint, args: &[Value]) -> Result<Value, ApiError>;
}

pub struct HttpActivityApi {
    http: Client,
    server_url: Url,
    token: Option<String>,
}

impl HttpActivityApi {
    pub fn new(server_url: Url) -> Self {
        Self {
            http: Client::new(),
            server_url,
            token: None,
        }
    }

    pub fn with_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Token forwarded upstream as `Authorization: Token <token>`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn rpc_url(&self, endpoint: &Endpoint) -> Result<Url, ApiError> {
        let base = self.server_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/rpc/{}", endpoint.name()))
            .map_err(|err| ApiError::new(ErrorCode::Internal, format!("invalid rpc url: {err}")))
    }
}

#[async_trait]
impl ActivityApi for HttpActivityApi {
    async fn call(&self, endpoint: &Endpoint, args: &[Value]) -> Result<Value, ApiError> {
        let url = self.rpc_url(endpoint)?;
        debug!(%endpoint, args = args.len(), "rpc call");

        let mut request = self.http.post(url).json(&RpcRequest {
            args: args.to_vec(),
        });
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
        }
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        let parsed = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&body).into_owned())
            })
        };

        if status.is_success() {
            return Ok(parsed);
        }
        warn!(%endpoint, status = status.as_u16(), "rpc call rejected");
        Err(error_from_body(status.as_u16(), parsed))
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::new(ErrorCode::Transport, err.to_string())
}

/// Prefers an `ApiError` body from the proxy; otherwise derives one from the status code.
fn error_from_body(status: u16, body: Value) -> ApiError {
    if let Ok(error) = serde_json::from_value::<ApiError>(body.clone()) {
        return error;
    }
    let message = match &body {
        Value::String(text) if !text.is_empty() => text.clone(),
        _ => format!("remote call failed with status {status}"),
    };
    let error = ApiError::new(ErrorCode::from_status(status), message);
    match body {
        Value::Null | Value::String(_) => error,
        details => error.with_details(details),
    }
}
