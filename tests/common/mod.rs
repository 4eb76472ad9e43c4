#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Duration;
use serde_json::{json, Value};

use tagline_web::auth::{encode_credential, Claims};
use tagline_web::config::AppConfig;
use tagline_web::state::AppState;

pub const SECRET: &str = "integration-secret";
pub const PASSWORD: &str = "correct horse";

/// Sign a credential the way the backend would
pub fn token(roles: &[&str], ttl: Duration) -> String {
    let claims = Claims::new(
        "user-1",
        "member@example.com",
        roles.iter().map(|r| r.to_string()).collect(),
        ttl,
    );
    encode_credential(&claims, SECRET).expect("sign test credential")
}

/// What the fake backend saw and what it serves
#[derive(Default)]
pub struct BackendLog {
    /// `since` query of every event stream request, in order
    pub event_requests: Mutex<Vec<Option<String>>>,
    pub status_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    /// Authorization headers received on ingest calls
    pub bearer: Mutex<Vec<String>>,
    /// SSE body replayed on every event stream request
    pub event_body: Mutex<String>,
}

impl BackendLog {
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn event_requests(&self) -> Vec<Option<String>> {
        self.event_requests.lock().unwrap().clone()
    }

    pub fn set_events(&self, body: impl Into<String>) {
        *self.event_body.lock().unwrap() = body.into();
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub log: Arc<BackendLog>,
}

impl MockBackend {
    pub async fn spawn() -> Result<Self> {
        let log = Arc::new(BackendLog::default());

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/ingest/status", get(status))
            .route("/ingest/start", post(start))
            .route("/ingest/cancel", post(cancel))
            .route("/ingest/events", get(events))
            .route("/photos", get(photos));

        let router = Router::new()
            .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
            .nest("/api/v1", api)
            .with_state(log.clone());

        let addr = serve(router).await?;
        Ok(Self {
            base_url: format!("http://{}", addr),
            log,
        })
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({ "access_token": token(&["member"], Duration::hours(1)), "token_type": "bearer" }))
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Invalid credentials" }))).into_response()
    }
}

async fn status(State(log): State<Arc<BackendLog>>, headers: HeaderMap) -> Json<Value> {
    log.status_calls.fetch_add(1, Ordering::SeqCst);
    record_bearer(&log, &headers);
    Json(json!({
        "job_id": "job-1",
        "status": "completed",
        "metadata": { "processed": 50 },
        "completed_at": "2025-03-01T12:05:00Z"
    }))
}

async fn start(State(log): State<Arc<BackendLog>>, headers: HeaderMap) -> Response {
    record_bearer(&log, &headers);
    // First start succeeds, anything after hits the running job
    if log.start_calls.fetch_add(1, Ordering::SeqCst) == 0 {
        (StatusCode::ACCEPTED, Json(json!({ "job_id": "job-1", "status": "running" }))).into_response()
    } else {
        (StatusCode::CONFLICT, Json(json!({ "detail": "Ingest already running" }))).into_response()
    }
}

async fn cancel() -> Json<Value> {
    Json(json!({ "cancelled": true }))
}

async fn photos(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({ "items": [], "page": query.get("page").cloned().unwrap_or_default() }))
}

async fn events(
    State(log): State<Arc<BackendLog>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    log.event_requests.lock().unwrap().push(query.get("since").cloned());
    let body = log.event_body.lock().unwrap().clone();
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn record_bearer(log: &BackendLog, headers: &HeaderMap) {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        log.bearer.lock().unwrap().push(value.to_string());
    }
}

/// Configuration pointing at a mock backend, with fast reconnects
pub fn test_config(backend_url: &str) -> AppConfig {
    let mut config = AppConfig::development();
    config.backend.base_url = backend_url.to_string();
    config.backend.timeout_secs = 5;
    config.session.jwt_secret = SECRET.to_string();
    config.progress.base_delay_ms = 10;
    config.progress.max_delay_ms = 50;
    config
}

pub struct TestApp {
    pub base_url: String,
    pub backend: MockBackend,
    /// Never follows redirects so tests can assert on them
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn cookie(token: &str) -> String {
        format!("auth_token={}", token)
    }
}

/// Web tier in front of a fresh mock backend, both on ephemeral ports
pub async fn spawn_app() -> Result<TestApp> {
    let backend = MockBackend::spawn().await?;
    let state = AppState::new(test_config(&backend.base_url)).context("build app state")?;
    let addr = serve(tagline_web::routes::app(state)).await?;

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    Ok(TestApp {
        base_url: format!("http://{}", addr),
        backend,
        client,
    })
}

async fn serve(router: Router) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// Decode the `from` parameter of a login redirect
pub fn from_param(location: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "from")
        .map(|(_, v)| v.into_owned())
}

/// Poll until `check` holds, failing after two seconds
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
