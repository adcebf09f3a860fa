use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use server_api::{
    add_activity, add_basic_information, add_participating_organisation, call,
    get_code_list_items, ApiContext, UserContext,
};
use shared::{
    domain::ActivityId,
    error::{ApiError, ApiException, ErrorCode},
    protocol::{CodeListItem, Endpoint, RpcRequest},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

type Rejection = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let oipa = settings.oipa()?;
    info!(
        read = %oipa.read_url,
        write = %oipa.write_url,
        delete = %oipa.delete_url,
        "forwarding to OIPA"
    );
    let api = ApiContext::new(oipa, settings.request_timeout()).map_err(ApiException::from)?;

    let state = AppState {
        api,
        max_body_bytes: settings.max_body_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/rpc/:endpoint", post(rpc))
        .route("/activities", post(http_add_activity))
        .route("/activities/basic_information", post(http_add_basic_information))
        .route(
            "/activities/:activity_id/participating_organisations",
            post(http_add_participating_organisation),
        )
        .route("/codelists/:code_list_type", get(http_get_code_list_items))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn user_context(headers: &HeaderMap) -> UserContext {
    UserContext::from_authorization(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    )
}

fn reject(err: ApiError) -> Rejection {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err))
}

async fn rpc(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RpcRequest>,
) -> Result<Json<Value>, Rejection> {
    let Some(parsed) = Endpoint::parse(&endpoint) else {
        return Err(reject(ApiError::new(
            ErrorCode::NotFound,
            format!("unknown endpoint {endpoint}"),
        )));
    };
    call(&state.api, &user_context(&headers), &parsed, &req.args)
        .await
        .map(Json)
        .map_err(|err| {
            warn!(%endpoint, code = ?err.code, "rpc failed: {}", err.message);
            reject(err)
        })
}

async fn http_add_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    add_activity(&state.api, &user_context(&headers), &form)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_add_basic_information(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    add_basic_information(&state.api, &user_context(&headers), &form)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_add_participating_organisation(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    headers: HeaderMap,
    Json(form): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    add_participating_organisation(
        &state.api,
        &user_context(&headers),
        &form,
        ActivityId(activity_id),
    )
    .await
    .map(Json)
    .map_err(reject)
}

async fn http_get_code_list_items(
    State(state): State<Arc<AppState>>,
    Path(code_list_type): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<CodeListItem>>, Rejection> {
    get_code_list_items(&state.api, &user_context(&headers), &code_list_type)
        .await
        .map(Json)
        .map_err(reject)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
