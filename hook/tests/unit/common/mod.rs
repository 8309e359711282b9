//! Shared test fixtures: an in-process fake of the Render API, a recording
//! notifier and settings pointing at both.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use renderhook::errors::HookError;
use renderhook::notify::message::DeployNotification;
use renderhook::notify::Notifier;
use renderhook::storage::settings::Settings;

pub const TOKEN: &str = "s3cr3t12";
pub const API_KEY: &str = "KEY1";
pub const SERVICE_ID: &str = "srv-demo";
pub const DEPLOY_ID: &str = "dep-1";

// ================================ FAKE RENDER ==================================== //

/// Scriptable stand-in for the Render API
pub struct FakeRender {
    pub services: Mutex<Value>,
    pub statuses: Mutex<VecDeque<String>>,
    pub finished_at: Mutex<Option<String>>,
    pub trigger_status: Mutex<StatusCode>,
    pub trigger_delay: Mutex<Duration>,
    pub custom_domains: Mutex<Value>,
    pub fail_polls: AtomicBool,
    pub fail_custom_domains: AtomicBool,
    pub triggers: AtomicUsize,
    pub polls: AtomicUsize,
    pub last_services_query: Mutex<HashMap<String, String>>,
}

impl Default for FakeRender {
    fn default() -> Self {
        Self {
            services: Mutex::new(json!([
                {
                    "cursor": "c1",
                    "service": {
                        "id": SERVICE_ID,
                        "name": "demo-web",
                        "type": "web_service",
                        "suspended": "not_suspended",
                        "serviceDetails": { "url": "https://demo-web.onrender.com" }
                    }
                }
            ])),
            statuses: Mutex::new(VecDeque::from(["live".to_string()])),
            finished_at: Mutex::new(Some("2024-11-04T02:35:40Z".to_string())),
            trigger_status: Mutex::new(StatusCode::CREATED),
            trigger_delay: Mutex::new(Duration::ZERO),
            custom_domains: Mutex::new(json!([
                { "cursor": "d1", "customDomain": { "name": "demo.example.com", "verificationStatus": "verified" } },
                { "cursor": "d2", "customDomain": { "name": "staging.example.com", "verificationStatus": "unverified" } },
                { "cursor": "d3", "customDomain": { "name": "www.example.com", "verificationStatus": "verified" } }
            ])),
            fail_polls: AtomicBool::new(false),
            fail_custom_domains: AtomicBool::new(false),
            triggers: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            last_services_query: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeRender {
    /// Script the statuses returned by successive polls; the last one repeats
    pub fn script_statuses(&self, statuses: &[&str]) {
        *self.statuses.lock().unwrap() = statuses.iter().map(|s| s.to_string()).collect();
    }

    pub fn triggers(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> String {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap_or_else(|| "live".to_string())
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", API_KEY);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str())
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "unauthorized"}))).into_response()
}

async fn list_services(
    State(fake): State<Arc<FakeRender>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    *fake.last_services_query.lock().unwrap() = query;
    let services = fake.services.lock().unwrap().clone();
    Json(services).into_response()
}

async fn trigger_deploy(
    State(fake): State<Arc<FakeRender>>,
    Path(service_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    fake.triggers.fetch_add(1, Ordering::SeqCst);
    let delay = *fake.trigger_delay.lock().unwrap();
    tokio::time::sleep(delay).await;

    let status = *fake.trigger_status.lock().unwrap();
    if status.is_server_error() {
        return (status, Json(json!({"message": "upstream exploded"}))).into_response();
    }
    (
        status,
        Json(json!({
            "id": DEPLOY_ID,
            "status": "created",
            "createdAt": "2024-11-04T02:30:00Z",
            "serviceId": service_id
        })),
    )
        .into_response()
}

async fn get_deploy(
    State(fake): State<Arc<FakeRender>>,
    Path((_service_id, deploy_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    fake.polls.fetch_add(1, Ordering::SeqCst);
    if fake.fail_polls.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, "bad gateway").into_response();
    }

    let status = fake.next_status();
    let finished_at = fake.finished_at.lock().unwrap().clone();
    Json(json!({
        "id": deploy_id,
        "status": status,
        "createdAt": "2024-11-04T02:30:00Z",
        "finishedAt": finished_at
    }))
    .into_response()
}

async fn list_custom_domains(State(fake): State<Arc<FakeRender>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if fake.fail_custom_domains.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let domains = fake.custom_domains.lock().unwrap().clone();
    Json(domains).into_response()
}

/// Start the fake on an ephemeral port; returns it with its `/v1` base URL
pub async fn start_fake_render() -> (Arc<FakeRender>, String) {
    let fake = Arc::new(FakeRender::default());
    let app = Router::new()
        .route("/v1/services", get(list_services))
        .route("/v1/services/{service_id}/deploys", post(trigger_deploy))
        .route("/v1/services/{service_id}/deploys/{deploy_id}", get(get_deploy))
        .route("/v1/services/{service_id}/custom-domains", get(list_custom_domains))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (fake, format!("http://{}/v1", addr))
}

// ============================== RECORDING NOTIFIER =============================== //

/// Forwards every notification to a channel
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<DeployNotification>,
}

impl RecordingNotifier {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DeployNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &DeployNotification) -> Result<(), HookError> {
        self.tx
            .send(notification.clone())
            .map_err(|e| HookError::NotifyError(e.to_string()))
    }
}

/// Wait for the next notification, failing the test after a few seconds
pub async fn next_notification(
    rx: &mut mpsc::UnboundedReceiver<DeployNotification>,
) -> DeployNotification {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no notification within 5s")
        .expect("notifier channel closed")
}

// ================================== SETTINGS ===================================== //

/// Settings with projects `demo` (KEY1), `nav` (KEY2) and `empty` (no key),
/// fast polling and the given cooldown
pub fn test_settings(base_url: &str, locks_dir: &TempDir, deploy_interval: Duration) -> Settings {
    let locks = locks_dir.path().to_string_lossy().to_string();
    let vars = vec![
        ("SECRET_TOKEN".to_string(), TOKEN.to_string()),
        ("PROJECT__demo__SERVICE_NAME".to_string(), "Demo".to_string()),
        ("PROJECT__demo__API_KEY".to_string(), API_KEY.to_string()),
        ("PROJECT__nav__SERVICE_NAME".to_string(), "Nav".to_string()),
        ("PROJECT__nav__API_KEY".to_string(), "KEY2".to_string()),
        ("PROJECT__empty__SERVICE_NAME".to_string(), "Empty".to_string()),
        ("PROJECT__empty__API_KEY".to_string(), String::new()),
        ("RENDER_API_BASE_URL".to_string(), base_url.to_string()),
        ("LOCKS_DIR".to_string(), locks),
    ];

    let mut settings = Settings::from_vars(vars).unwrap();
    settings.deploy_interval = deploy_interval;
    settings.poll_interval = Duration::from_millis(10);
    settings
}
