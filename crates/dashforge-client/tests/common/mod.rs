//! In-process fake of the Grafana HTTP API.
//!
//! Serves just enough of the folder and dashboard endpoints to exercise the
//! client, and records what it received.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct FakeState {
    pub folders: Vec<Value>,
    pub dashboards: HashMap<String, Value>,
    pub folder_posts: u32,
    pub folder_list_limits: Vec<Option<String>>,
    pub auth_headers: Vec<Option<String>>,
    pub upsert_bodies: Vec<Value>,
    /// Answer upserts with 412 when set.
    pub reject_upserts: bool,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeGrafana {
    addr: SocketAddr,
    pub state: Shared,
}

impl FakeGrafana {
    /// Start the fake on an available port.
    pub async fn start() -> Self {
        Self::start_with(FakeState::default()).await
    }

    pub async fn start_with(initial: FakeState) -> Self {
        let state: Shared = Arc::new(Mutex::new(initial));
        let app = Router::new()
            .route("/api/health", get(health))
            .route("/api/folders", get(list_folders).post(create_folder))
            .route("/api/dashboards/db", post(upsert_dashboard))
            .route("/api/dashboards/uid/{uid}", delete(delete_dashboard))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn auth(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn health(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    state.lock().await.auth_headers.push(auth(&headers));
    Json(json!({"database": "ok", "version": "11.1.0"}))
}

async fn list_folders(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let mut state = state.lock().await;
    state.auth_headers.push(auth(&headers));
    state.folder_list_limits.push(params.get("limit").cloned());
    Json(Value::Array(state.folders.clone()))
}

async fn create_folder(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().await;
    state.auth_headers.push(auth(&headers));
    state.folder_posts += 1;
    let folder = json!({
        "id": state.folders.len() + 1,
        "uid": format!("folder-{}", state.folders.len() + 1),
        "title": body["title"],
    });
    state.folders.push(folder.clone());
    Json(folder)
}

async fn upsert_dashboard(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().await;
    state.auth_headers.push(auth(&headers));
    state.upsert_bodies.push(body.clone());

    if state.reject_upserts {
        return (
            StatusCode::PRECONDITION_FAILED,
            Json(json!({"message": "version-mismatch"})),
        )
            .into_response();
    }

    let uid = body["dashboard"]["uid"].as_str().unwrap_or_default().to_string();
    let version = state
        .dashboards
        .get(&uid)
        .and_then(|d| d["version"].as_i64())
        .unwrap_or(0)
        + 1;
    let mut stored = body["dashboard"].clone();
    stored["version"] = json!(version);
    state.dashboards.insert(uid.clone(), stored);

    Json(json!({
        "id": 1,
        "uid": uid,
        "url": format!("/d/{uid}/{uid}"),
        "status": "success",
        "version": version,
    }))
    .into_response()
}

async fn delete_dashboard(
    State(state): State<Shared>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().await;
    state.auth_headers.push(auth(&headers));
    match state.dashboards.remove(&uid) {
        Some(dashboard) => Json(json!({
            "title": dashboard["title"],
            "message": "Dashboard deleted",
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Dashboard not found"})),
        )
            .into_response(),
    }
}
