#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use brand_client_core::{ClientConfig, MemoryCredentialStore, SessionManager};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRequest {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct StubState {
    pub login: (u16, Value),
    pub verify: (u16, Value),
    pub password: (u16, Value),
    pub brand_status: u16,
    pub brand: Value,
    /// Brands served for ids other than the default one.
    pub other_brands: HashMap<String, Value>,
    pub write_response: Value,
    /// Replaces the brand after any write, standing in for server-side logic.
    pub after_write: Option<Value>,
    pub verify_calls: usize,
    pub brand_gets: usize,
    pub requests: Vec<CapturedRequest>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            login: (
                200,
                json!({
                    "success": true,
                    "data": {
                        "token": "t1",
                        "expiresIn": "1h",
                        "user": {"id": "u1", "email": "a@b.com", "tenantId": "br1"}
                    }
                }),
            ),
            verify: (
                200,
                json!({"success": true, "data": {"valid": true, "payload": {"sub": "u1"}}}),
            ),
            password: (200, json!({"success": true, "data": {"updated": true}})),
            brand_status: 200,
            brand: json!({
                "brandId": "br1",
                "name": "Acme",
                "timezone": "America/New_York",
                "phoneNumbers": ["+15550100"],
                "config": {
                    "videoGoal": "awareness",
                    "videoConfigs": {"introDuration": 5, "splitDuration": 10},
                    "brandColors": {"primary": "#001f3f"}
                }
            }),
            other_brands: HashMap::new(),
            write_response: json!({"success": true, "data": {}}),
            after_write: None,
            verify_calls: 0,
            brand_gets: 0,
            requests: Vec::new(),
        }
    }
}

impl StubState {
    fn record(
        &mut self,
        method: &'static str,
        path: String,
        query: HashMap<String, String>,
        headers: &HeaderMap,
        body: Option<Value>,
    ) {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.push(CapturedRequest {
            method,
            path,
            query,
            authorization,
            body,
        });
    }

    fn brand_mut(&mut self, id: &str) -> &mut Value {
        match self.other_brands.get_mut(id) {
            Some(brand) => brand,
            None => &mut self.brand,
        }
    }

    pub fn requests_to(&self, path: &str) -> Vec<CapturedRequest> {
        self.requests
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }
}

pub type SharedStub = Arc<Mutex<StubState>>;

pub struct StubBackend {
    pub base_url: String,
    pub state: SharedStub,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl StubBackend {
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            default_api_base_url: Some(self.base_url.clone()),
            timeout_ms: 5_000,
            ..ClientConfig::default()
        }
    }

    pub fn manager(&self) -> SessionManager<MemoryCredentialStore> {
        SessionManager::new(MemoryCredentialStore::new(), self.config())
    }

    pub async fn signed_in_manager(&self) -> Result<SessionManager<MemoryCredentialStore>> {
        let mut manager = self.manager();
        manager
            .sign_in_with_password("a@b.com", "secret123", None)
            .await?;
        Ok(manager)
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn login(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().await;
    state.record(
        "POST",
        "/api/v1/auth/login".to_string(),
        HashMap::new(),
        &headers,
        Some(body),
    );
    let (code, payload) = state.login.clone();
    (status(code), Json(payload))
}

async fn verify(State(state): State<SharedStub>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().await;
    state.verify_calls += 1;
    state.record(
        "GET",
        "/api/v1/auth/verify".to_string(),
        HashMap::new(),
        &headers,
        None,
    );
    let (code, payload) = state.verify.clone();
    (status(code), Json(payload))
}

async fn change_password(
    State(state): State<SharedStub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().await;
    state.record(
        "PUT",
        "/api/v1/auth/password".to_string(),
        HashMap::new(),
        &headers,
        Some(body),
    );
    let (code, payload) = state.password.clone();
    (status(code), Json(payload))
}

async fn get_brand(
    State(state): State<SharedStub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().await;
    state.brand_gets += 1;
    state.record(
        "GET",
        format!("/api/v1/brands/{id}"),
        HashMap::new(),
        &headers,
        None,
    );
    if state.brand_status >= 300 {
        return (
            status(state.brand_status),
            Json(json!({"success": false, "error": "Brand not found"})),
        );
    }
    let brand = state.brand_mut(id.as_str()).clone();
    (
        StatusCode::OK,
        Json(json!({"success": true, "data": brand})),
    )
}

async fn put_brand(
    State(state): State<SharedStub>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().await;
    state.record(
        "PUT",
        format!("/api/v1/brands/{id}"),
        query.clone(),
        &headers,
        Some(body.clone()),
    );

    let response = state.write_response.clone();
    if response.get("success") != Some(&Value::Bool(true)) {
        return (StatusCode::OK, Json(response));
    }

    let after_write = state.after_write.clone();
    let brand = state.brand_mut(id.as_str());
    if let Some(after_write) = after_write {
        *brand = after_write;
    } else if query.get("replaceFields").map(String::as_str) == Some("config") {
        brand["config"] = body.get("config").cloned().unwrap_or(Value::Null);
    } else if let Value::Object(fields) = body {
        for (key, value) in fields {
            brand[key.as_str()] = value;
        }
    }
    (StatusCode::OK, Json(response))
}

async fn plain_text() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

pub async fn spawn_stub(initial: StubState) -> Result<StubBackend> {
    let state: SharedStub = Arc::new(Mutex::new(initial));
    let app = Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/verify", get(verify))
        .route("/api/v1/auth/password", put(change_password))
        .route("/api/v1/brands/:id", get(get_brand).put(put_brand))
        .route("/plain", get(plain_text))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });

    Ok(StubBackend {
        base_url: format!("http://{addr}"),
        state,
        shutdown: Some(shutdown_tx),
    })
}
