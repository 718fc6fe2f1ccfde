//! In-process mock backend shared by the integration tests.

use std::convert::Infallible;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::time::Instant;

use redteam_console::models::session::RunParams;
use redteam_console::ClientConfig;

/// Session id every mock run is created under.
pub const SESSION_ID: &str = "sess-1";

#[derive(Default)]
struct Inner {
    fail_create: AtomicBool,
    fail_run: AtomicBool,
    hang_stream: AtomicBool,
    stop_calls: AtomicUsize,
    resume_calls: AtomicUsize,
    state_calls: AtomicUsize,
    frames: Mutex<Vec<String>>,
    state_body: Mutex<Value>,
    actions: Mutex<Vec<Value>>,
    session_requests: Mutex<Vec<Value>>,
}

/// One mock backend per test, bound to an ephemeral port.
pub struct MockBackend {
    inner: Arc<Inner>,
    base_url: String,
}

impl MockBackend {
    pub async fn start() -> Self {
        let inner = Arc::new(Inner {
            state_body: Mutex::new(json!({ "session_id": SESSION_ID })),
            ..Inner::default()
        });

        let app = Router::new()
            .route("/sessions", post(create_session))
            .route("/sessions/{id}/run", post(start_run))
            .route("/sessions/{id}/stream", get(stream_events))
            .route("/sessions/{id}/state", get(fetch_state))
            .route("/sessions/{id}/stop", post(stop_run))
            .route("/sessions/{id}/resume", get(resume))
            .route("/actions", post(submit_action))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock backend");
        });

        Self {
            inner,
            base_url: format!("http://{addr}"),
        }
    }

    /// Client configuration pointed at this backend, with a fast poll
    /// interval so tests observe the poller quickly.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.base_url).expect("valid backend url");
        config.poll_interval_ms = 50;
        config.request_timeout_seconds = 5;
        config
    }

    /// Raw frame payloads the stream endpoint will serve, in order.
    pub fn set_frames(&self, frames: Vec<String>) {
        *self.inner.frames.lock().unwrap() = frames;
    }

    /// Keep the stream connection open after the scripted frames instead
    /// of closing it.
    pub fn hang_after_frames(&self) {
        self.inner.hang_stream.store(true, Ordering::SeqCst);
    }

    pub fn fail_create(&self) {
        self.inner.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_run(&self) {
        self.inner.fail_run.store(true, Ordering::SeqCst);
    }

    pub fn set_state(&self, body: Value) {
        *self.inner.state_body.lock().unwrap() = body;
    }

    pub fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.inner.resume_calls.load(Ordering::SeqCst)
    }

    pub fn state_calls(&self) -> usize {
        self.inner.state_calls.load(Ordering::SeqCst)
    }

    pub fn actions(&self) -> Vec<Value> {
        self.inner.actions.lock().unwrap().clone()
    }

    pub fn session_requests(&self) -> Vec<Value> {
        self.inner.session_requests.lock().unwrap().clone()
    }
}

async fn create_session(State(inner): State<Arc<Inner>>, Json(body): Json<Value>) -> Response {
    inner.session_requests.lock().unwrap().push(body);
    if inner.fail_create.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({ "session_id": SESSION_ID })).into_response()
}

async fn start_run(State(inner): State<Arc<Inner>>) -> StatusCode {
    if inner.fail_run.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn stream_events(State(inner): State<Arc<Inner>>) -> Response {
    let payloads = inner.frames.lock().unwrap().clone();
    let mut body = String::new();
    for payload in &payloads {
        body.push_str("data: ");
        body.push_str(payload);
        body.push_str("\n\n");
    }

    let head = stream::iter(vec![Ok::<Bytes, Infallible>(Bytes::from(body))]);
    let stream_body = if inner.hang_stream.load(Ordering::SeqCst) {
        Body::from_stream(head.chain(stream::pending()))
    } else {
        Body::from_stream(head)
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(stream_body)
        .expect("stream response")
}

async fn fetch_state(State(inner): State<Arc<Inner>>) -> Json<Value> {
    inner.state_calls.fetch_add(1, Ordering::SeqCst);
    Json(inner.state_body.lock().unwrap().clone())
}

async fn stop_run(State(inner): State<Arc<Inner>>) -> StatusCode {
    inner.stop_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn resume(State(inner): State<Arc<Inner>>) -> StatusCode {
    inner.resume_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn submit_action(State(inner): State<Arc<Inner>>, Json(body): Json<Value>) -> StatusCode {
    inner.actions.lock().unwrap().push(body);
    StatusCode::OK
}

/// A raw frame payload in the backend's envelope shape.
pub fn frame(kind: &str, data: &str, metadata: Value) -> String {
    json!({ "type": kind, "data": data, "metadata": metadata }).to_string()
}

/// Run parameters that pass validation.
pub fn run_params() -> RunParams {
    RunParams {
        target: "https://victim.example".into(),
        goal: "enumerate the admin panel".into(),
        model: "agent-large".into(),
        ..RunParams::default()
    }
}

/// Poll `check` until it holds or a five second deadline passes.
pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
