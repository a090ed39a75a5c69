//! Azure API Management mock server
//!
//! A lightweight Axum server answering the subset of the ARM
//! Microsoft.ApiManagement API the client uses. Every request must carry
//! `Authorization: Bearer test-token`; writes are recorded for assertions.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TOKEN: &str = "test-token";

const SERVICE: &str = "/subscriptions/{subscription}/resourceGroups/{group}/providers/Microsoft.ApiManagement/service/{service}";

/// Request recorded by the mock: method, path (without query) and JSON body
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct MockState {
    base_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl MockState {
    fn record(&self, method: &'static str, path: String, body: Value) {
        self.recorded.lock().unwrap().push(Recorded { method, path, body });
    }

    fn service_url(&self, params: &HashMap<String, String>) -> String {
        format!("{}{}", self.base_url, service_id(params))
    }
}

/// Handle to a running mock server
#[derive(Debug)]
pub struct MockArm {
    pub addr: SocketAddr,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl MockArm {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let expected = format!("Bearer {TOKEN}");
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    (!authorized).then(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": "AuthenticationFailed", "message": "invalid token"}})),
        )
            .into_response()
    })
}

/// ARM resource id of the service
fn service_id(params: &HashMap<String, String>) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ApiManagement/service/{}",
        params["subscription"], params["group"], params["service"]
    )
}

fn operation_resource(
    params: &HashMap<String, String>,
    api: &str,
    operation: &str,
    properties: Value,
) -> Value {
    json!({
        "id": format!("{}/apis/{api}/operations/{operation}", service_id(params)),
        "name": operation,
        "properties": properties,
    })
}

async fn list_apis(
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    let id_prefix = service_id(&params);
    Json(json!({
        "value": [{
            "id": format!("{id_prefix}/apis/orders"),
            "name": "orders",
            "properties": {
                "displayName": "Orders",
                "path": "orders",
                "apiRevision": "3",
                "isCurrent": true
            }
        }]
    }))
    .into_response()
}

/// Two pages: the first links to the second through `$skiptoken`
async fn list_operations(
    State(state): State<MockState>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    let service_url = state.service_url(&params);
    let api = &params["api"];

    if query.get("$skiptoken").map(String::as_str) == Some("2") {
        return Json(json!({
            "value": [operation_resource(&params, api, "users-post-2", json!({
                "displayName": "Post Users",
                "method": "POST",
                "urlTemplate": "/users"
            }))]
        }))
        .into_response();
    }

    Json(json!({
        "value": [operation_resource(&params, api, "users-get-1", json!({
            "displayName": "Get Users",
            "method": "GET",
            "urlTemplate": "/users",
            "description": ""
        }))],
        "nextLink": format!("{service_url}/apis/{api}/operations?api-version=2022-08-01&$skiptoken=2")
    }))
    .into_response()
}

async fn list_operations_by_tags(
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    if query.get("includeNotTaggedOperations").map(String::as_str) != Some("false") {
        return (StatusCode::BAD_REQUEST, "untagged operations requested").into_response();
    }
    let api = &params["api"];
    Json(json!({
        "value": [
            {
                "tag": {"id": "/tags/apimsync1", "name": "apim-sync"},
                "operation": {"id": format!("/apis/{api}/operations/users-get-1"), "name": "Get Users"}
            },
            {
                "tag": {"id": "/tags/users42", "name": "users"},
                "operation": {"id": format!("/apis/{api}/operations/users-get-1"), "name": "Get Users"}
            },
            { "tag": {"id": "/tags/orphan7", "name": "orphan"} }
        ]
    }))
    .into_response()
}

async fn list_tags(headers: HeaderMap) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    Json(json!({
        "value": [
            {"id": "/tags/apimsync1", "name": "apimsync1", "properties": {"displayName": "apim-sync"}},
            {"id": "/tags/users42", "name": "users42", "properties": {"displayName": "users"}}
        ],
        "nextLink": ""
    }))
    .into_response()
}

async fn put_operation(
    State(state): State<MockState>,
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    let (api, operation) = (&params["api"], &params["operation"]);
    state.record("PUT", format!("apis/{api}/operations/{operation}"), body.clone());

    if operation == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded").into_response();
    }
    let properties = body.get("properties").cloned().unwrap_or(Value::Null);
    Json(operation_resource(&params, api, operation, properties)).into_response()
}

async fn delete_operation(
    State(state): State<MockState>,
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    if headers.get("if-match").and_then(|v| v.to_str().ok()) != Some("*") {
        return (StatusCode::PRECONDITION_FAILED, "If-Match header required").into_response();
    }
    let (api, operation) = (&params["api"], &params["operation"]);
    state.record("DELETE", format!("apis/{api}/operations/{operation}"), Value::Null);

    if operation == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    StatusCode::OK.into_response()
}

async fn put_policy(
    State(state): State<MockState>,
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    if body["properties"]["format"] != "rawxml" {
        return (StatusCode::BAD_REQUEST, "unsupported policy format").into_response();
    }
    let (api, operation) = (&params["api"], &params["operation"]);
    state.record(
        "PUT",
        format!("apis/{api}/operations/{operation}/policies/policy"),
        body,
    );
    StatusCode::CREATED.into_response()
}

async fn put_tag(
    State(state): State<MockState>,
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    let tag = &params["tag"];
    state.record("PUT", format!("tags/{tag}"), body.clone());
    Json(json!({
        "id": format!("/tags/{tag}"),
        "name": tag,
        "properties": {"displayName": body["properties"]["displayName"]}
    }))
    .into_response()
}

async fn put_release(
    State(state): State<MockState>,
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }
    let (api, release) = (&params["api"], &params["release"]);
    state.record("PUT", format!("apis/{api}/releases/{release}"), body);
    StatusCode::CREATED.into_response()
}

/// Bind to an ephemeral port and serve in the background
pub async fn start() -> MockArm {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        base_url: format!("http://{addr}"),
        recorded: Arc::clone(&recorded),
    };

    let app = Router::new()
        .route(&format!("{SERVICE}/apis"), get(list_apis))
        .route(&format!("{SERVICE}/apis/{{api}}/operations"), get(list_operations))
        .route(
            &format!("{SERVICE}/apis/{{api}}/operationsByTags"),
            get(list_operations_by_tags),
        )
        .route(
            &format!("{SERVICE}/apis/{{api}}/operations/{{operation}}"),
            put(put_operation).delete(delete_operation),
        )
        .route(
            &format!("{SERVICE}/apis/{{api}}/operations/{{operation}}/policies/policy"),
            put(put_policy),
        )
        .route(&format!("{SERVICE}/tags"), get(list_tags))
        .route(&format!("{SERVICE}/tags/{{tag}}"), put(put_tag))
        .route(
            &format!("{SERVICE}/apis/{{api}}/releases/{{release}}"),
            put(put_release),
        )
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockArm { addr, recorded }
}
