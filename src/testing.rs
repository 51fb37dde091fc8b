//! In-process fake of the Deliverant API for gateway and client tests

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::proxy::config::GatewayConfig;
use crate::proxy::AxumServer;

pub const GOOD_KEY: &str = "dk_test_good";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path_and_query: String,
    pub authorization: String,
    pub content_type: String,
    pub body: String,
}

#[derive(Clone)]
pub struct FakeApi {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeApi {
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

fn envelope(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

fn delivery(id: &str) -> Value {
    json!({
        "id": id,
        "event_id": "evt_1",
        "endpoint_id": "ep_1",
        "endpoint_name": "orders",
        "event_type": "order.created",
        "mode": "RELIABLE",
        "status": "DELIVERED",
        "attempts_count": 1,
        "next_attempt_at": null,
        "first_scheduled_at": "2026-01-01T00:00:00Z",
        "last_attempt_at": "2026-01-01T00:00:01Z",
        "terminal_at": "2026-01-01T00:00:01Z",
        "terminal_reason": null,
        "cancel_requested": false,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:01Z"
    })
}

async fn fake_api(
    State(calls): State<Arc<Mutex<Vec<RecordedCall>>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let authorization = header_str(header::AUTHORIZATION);
    calls.lock().unwrap().push(RecordedCall {
        method: method.to_string(),
        path_and_query: uri
            .path_and_query()
            .map(|p| p.to_string())
            .unwrap_or_default(),
        authorization: authorization.clone(),
        content_type: header_str(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    if authorization != format!("Bearer {}", GOOD_KEY) {
        return envelope(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid API key");
    }

    let query = uri.query().unwrap_or_default();
    match (method.as_str(), uri.path()) {
        ("GET", "/v1/endpoints") => Json(json!([])).into_response(),
        ("GET", "/v1/deliveries") if query.contains("cursor=c1") => Json(json!({
            "results": [delivery("d3")],
            "has_more": false,
            "next_cursor": null
        }))
        .into_response(),
        ("GET", "/v1/deliveries") => Json(json!({
            "results": [delivery("d1"), delivery("d2")],
            "has_more": true,
            "next_cursor": "c1"
        }))
        .into_response(),
        ("POST", "/v1/deliveries/123/cancel") => {
            envelope(StatusCode::CONFLICT, "INVALID_STATE", "already delivered")
        }
        ("PATCH", path) if path.starts_with("/v1/endpoints/") => {
            let parsed: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            Json(parsed).into_response()
        }
        ("DELETE", path) if path.starts_with("/v1/endpoints/") => {
            StatusCode::NO_CONTENT.into_response()
        }
        _ => envelope(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found"),
    }
}

/// Start the fake API on an ephemeral port
pub async fn spawn_fake_api() -> FakeApi {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(fake_api).with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeApi { addr, calls }
}

/// Start a real gateway in front of `api`; returns its origin URL
pub async fn spawn_gateway(api: &FakeApi) -> (String, AxumServer) {
    let config = GatewayConfig {
        api_url: api.base_url(),
        port: 0,
        ..Default::default()
    };
    let (server, _handle) = AxumServer::start(&config).await.unwrap();
    (format!("http://{}", server.local_addr()), server)
}

/// One request captured by [`ScriptedFetcher`], answered by the test
pub struct PendingRequest {
    pub method: reqwest::Method,
    pub path: String,
    pub body: Option<Value>,
    responder: tokio::sync::oneshot::Sender<Result<Value, crate::client::ApiError>>,
}

impl PendingRequest {
    pub fn respond(self, result: Result<Value, crate::client::ApiError>) {
        let _ = self.responder.send(result);
    }

    pub fn ok(self, value: Value) {
        self.respond(Ok(value));
    }
}

/// Fetcher whose responses are released by the test in any order
pub struct ScriptedFetcher {
    tx: tokio::sync::mpsc::UnboundedSender<PendingRequest>,
}

pub struct Script {
    rx: tokio::sync::mpsc::UnboundedReceiver<PendingRequest>,
}

impl ScriptedFetcher {
    pub fn new() -> (Arc<Self>, Script) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Arc::new(Self { tx }), Script { rx })
    }
}

impl Script {
    /// Wait (bounded) for the next request
    pub async fn next(&mut self) -> PendingRequest {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("fetcher dropped")
    }

    /// Assert that no request arrives within `ms`
    pub async fn assert_idle(&mut self, ms: u64) {
        let next = tokio::time::timeout(std::time::Duration::from_millis(ms), self.rx.recv()).await;
        if let Ok(Some(request)) = next {
            panic!("unexpected request: {} {}", request.method, request.path);
        }
    }
}

#[async_trait::async_trait]
impl crate::client::Fetcher for ScriptedFetcher {
    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, crate::client::ApiError> {
        let (responder, response) = tokio::sync::oneshot::channel();
        let _ = self.tx.send(PendingRequest {
            method,
            path: path.to_string(),
            body,
            responder,
        });
        response
            .await
            .unwrap_or_else(|_| Err(crate::client::ApiError::network("request abandoned")))
    }
}

/// Minimal delivery row for sync tests
pub fn delivery_json(id: &str, event_type: &str, endpoint_name: &str) -> Value {
    let mut row = delivery(id);
    row["event_type"] = json!(event_type);
    row["endpoint_name"] = json!(endpoint_name);
    row
}

pub fn page_json(ids: &[&str], next_cursor: Option<&str>) -> Value {
    let results: Vec<Value> = ids.iter().map(|id| delivery(id)).collect();
    json!({
        "results": results,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor,
    })
}
