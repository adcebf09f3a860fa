use super::*;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method as HttpMethod, StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct Seen {
    host: &'static str,
    method: String,
    uri: String,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Upstream {
    host: &'static str,
    seen: Arc<Mutex<Vec<Seen>>>,
}

async fn record(
    State(upstream): State<Upstream>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    upstream.seen.lock().await.push(Seen {
        host: upstream.host,
        method: method.to_string(),
        uri: uri.to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    if uri.path().contains("/sectors/") && method == HttpMethod::POST {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "percentage": ["Ensure this value is less than or equal to 100."] })),
        )
            .into_response();
    }
    if method == HttpMethod::DELETE {
        return StatusCode::NO_CONTENT.into_response();
    }
    if uri.path().starts_with("/api/codelists/") {
        return Json(json!([{ "code": 1, "name": "Funding" }, { "code": "2", "name": "Accountable" }]))
            .into_response();
    }
    let mut echoed = body;
    if let Value::Object(fields) = &mut echoed {
        fields.entry("id").or_insert(json!(41));
    }
    Json(echoed).into_response()
}

async fn spawn_upstream(host: &'static str, seen: Arc<Mutex<Vec<Seen>>>) -> Url {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .fallback(record)
        .with_state(Upstream { host, seen });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Url::parse(&format!("http://{addr}")).expect("url")
}

async fn setup() -> (ApiContext, Arc<Mutex<Vec<Seen>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let oipa = OipaConfig::new(
        spawn_upstream("read", seen.clone()).await,
        spawn_upstream("write", seen.clone()).await,
        spawn_upstream("delete", seen.clone()).await,
    );
    let ctx = ApiContext::new(oipa, Duration::from_secs(5)).expect("context");
    (ctx, seen)
}

fn user() -> UserContext {
    UserContext::from_authorization(Some("Token abc123"))
}

#[tokio::test]
async fn create_is_posted_to_the_write_host_with_the_parsed_payload() {
    let (ctx, seen) = setup().await;
    let endpoint = Endpoint::crud(CrudOperation::Create, EntityKind::HumanitarianScope);
    let args = [
        json!(1),
        json!(5),
        json!(r#"{"type":{"code":1},"vocabulary":{"code":2},"code":3}"#),
    ];

    let body = call(&ctx, &user(), &endpoint, &args).await.expect("call");
    assert_eq!(body["id"], json!(41));

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].host, "write");
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].uri, "/api/activities/5/humanitarian_scopes/");
    assert_eq!(seen[0].authorization.as_deref(), Some("Token abc123"));
    assert_eq!(
        seen[0].body,
        json!({ "type": { "code": 1 }, "vocabulary": { "code": 2 }, "code": 3 })
    );
}

#[tokio::test]
async fn deletes_go_to_the_delete_host() {
    let (ctx, seen) = setup().await;
    let endpoint = Endpoint::crud(CrudOperation::Delete, EntityKind::IndicatorPeriod);
    let body = call(
        &ctx,
        &UserContext::anonymous(),
        &endpoint,
        &[json!(1), json!(5), json!(9), json!(11), json!(21)],
    )
    .await
    .expect("call");
    assert_eq!(body, Value::Null);

    let seen = seen.lock().await;
    assert_eq!(seen[0].host, "delete");
    assert_eq!(seen[0].method, "DELETE");
    assert_eq!(seen[0].uri, "/api/activities/5/results/9/indicators/11/periods/21/");
    assert_eq!(seen[0].authorization, None);
}

#[tokio::test]
async fn activity_update_uses_the_id_inside_the_payload() {
    let (ctx, seen) = setup().await;
    let endpoint = Endpoint::crud(CrudOperation::Update, EntityKind::Activity);
    call(&ctx, &user(), &endpoint, &[json!(1), json!(r#"{"id":5,"name":"A"}"#)])
        .await
        .expect("call");

    let seen = seen.lock().await;
    assert_eq!(seen[0].host, "write");
    assert_eq!(seen[0].method, "PUT");
    assert_eq!(seen[0].uri, "/api/activities/5/");
}

#[tokio::test]
async fn period_scoped_reads_are_listed_per_indicator() {
    let (ctx, seen) = setup().await;
    let endpoint = Endpoint::crud(CrudOperation::Get, EntityKind::IndicatorActualDimension);
    call(&ctx, &user(), &endpoint, &[json!(1), json!(5), json!(9), json!(11)])
        .await
        .expect("call");

    let seen = seen.lock().await;
    assert_eq!(seen[0].host, "read");
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].uri, "/api/activities/5/results/9/indicators/11/actual_dimensions/");
}

#[tokio::test]
async fn paginated_listing_carries_publisher_filters_and_page() {
    let (ctx, seen) = setup().await;
    let endpoint = Endpoint::activity(ActivityOperation::GetAll);
    call(
        &ctx,
        &user(),
        &endpoint,
        &[json!(1), json!({ "q": "water", "ordering": null }), json!(2)],
    )
    .await
    .expect("call");

    let seen = seen.lock().await;
    assert_eq!(seen[0].uri, "/api/activities/?publisher=1&q=water&page=2");
}

#[tokio::test]
async fn wrong_argument_count_never_reaches_upstream() {
    let (ctx, seen) = setup().await;
    let endpoint = Endpoint::crud(CrudOperation::Update, EntityKind::Sector);
    let err = call(&ctx, &user(), &endpoint, &[json!(1), json!(5), json!("{}")])
        .await
        .expect_err("id missing");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn upstream_rejection_keeps_field_errors() {
    let (ctx, _seen) = setup().await;
    let endpoint = Endpoint::crud(CrudOperation::Create, EntityKind::Sector);
    let err = call(
        &ctx,
        &user(),
        &endpoint,
        &[json!(1), json!(5), json!(r#"{"percentage":101}"#)],
    )
    .await
    .expect_err("rejected");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(
        err.details,
        Some(json!({ "percentage": ["Ensure this value is less than or equal to 100."] }))
    );
}

#[tokio::test]
async fn passthrough_helpers_hit_their_resources() {
    let (ctx, seen) = setup().await;
    add_activity(&ctx, &user(), &json!({ "iati_identifier": "NL-1" }))
        .await
        .expect("activity");
    add_basic_information(&ctx, &user(), &json!({ "activity": 5, "type": { "code": "1" } }))
        .await
        .expect("basic information");
    add_participating_organisation(&ctx, &user(), &json!({ "ref": "NL-KVK" }), ActivityId(5))
        .await
        .expect("participating organisation");
    let roles = get_code_list_items(&ctx, &user(), "OrganisationRole")
        .await
        .expect("code list");

    assert_eq!(roles.len(), 2);
    assert_eq!(roles[0].code, "1");
    let uris: Vec<_> = seen
        .lock()
        .await
        .iter()
        .map(|seen| (seen.host, seen.uri.clone()))
        .collect();
    assert_eq!(
        uris,
        vec![
            ("write", "/api/activities/".to_string()),
            ("write", "/api/activities/5/descriptions/".to_string()),
            ("write", "/api/activities/5/participating_organisations/".to_string()),
            ("read", "/api/codelists/OrganisationRole/".to_string()),
        ]
    );
}

#[tokio::test]
async fn basic_information_needs_an_activity() {
    let (ctx, seen) = setup().await;
    let err = add_basic_information(&ctx, &user(), &json!({ "type": { "code": "1" } }))
        .await
        .expect_err("no activity");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(seen.lock().await.is_empty());
}

#[test]
fn authorization_header_is_parsed_into_a_token() {
    assert_eq!(
        UserContext::from_authorization(Some("Token abc")).token.as_deref(),
        Some("abc")
    );
    assert_eq!(UserContext::from_authorization(Some("  ")).token, None);
    assert_eq!(UserContext::from_authorization(None), UserContext::anonymous());
}

#[test]
fn mark_ready_to_publish_is_a_write() {
    let endpoint = Endpoint::activity(ActivityOperation::MarkReadyToPublish);
    assert_eq!(endpoint.access(), Access::Write);
}
