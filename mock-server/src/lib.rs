//! In-memory Jobs API used as the live counterpart in client tests.
//!
//! Every route sits behind a bearer-token check. Besides job CRUD there are a
//! few fixture routes that return plain text, fail, echo the request back,
//! stall for a while or send an oversized body.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "test-token";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateJob {
    pub name: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "queued".to_string()
}

#[derive(Deserialize)]
struct BigParams {
    #[serde(default)]
    bytes: usize,
}

#[derive(Deserialize)]
struct SlowParams {
    #[serde(default)]
    ms: u64,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Job>>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    token: Arc<str>,
}

pub fn app(token: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        token: Arc::from(token),
    };
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/{id}", get(get_job).delete(delete_job))
        .route("/health", get(health))
        .route("/echo", any(echo))
        .route("/fail", get(fail))
        .route("/slow", get(slow))
        .route("/big", get(big))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        tracing::warn!(uri = %request.uri(), "rejected unauthenticated request");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response();
    }
    next.run(request).await
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    let jobs = state.db.read().await;
    Json(jobs.values().cloned().collect())
}

async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> (StatusCode, Json<Job>) {
    let job = Job {
        id: Uuid::new_v4(),
        name: input.name,
        status: input.status,
    };
    tracing::info!(id = %job.id, name = %job.name, "job created");
    state.db.write().await.insert(job.id, job.clone());
    (StatusCode::CREATED, Json(job))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, (StatusCode, Json<Value>)> {
    let jobs = state.db.read().await;
    jobs.get(&id).cloned().map(Json).ok_or_else(not_found)
}

async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut jobs = state.db.write().await;
    jobs.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or_else(not_found)
}

async fn health() -> &'static str {
    "ok"
}

async fn fail() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

async fn slow(Query(params): Query<SlowParams>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    "done"
}

async fn big(Query(params): Query<BigParams>) -> String {
    "x".repeat(params.bytes)
}

/// Describe the received request as JSON: method, query pairs in order,
/// lower-cased headers and the raw body.
async fn echo(
    method: Method,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let headers: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "headers": headers,
        "body": body,
    }))
}
