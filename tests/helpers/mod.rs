#![allow(dead_code)] // Test helpers appear unused when compiled independently

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;

const WAIT_ATTEMPTS: usize = 50;
const WAIT_DELAY: Duration = Duration::from_millis(100);

/// One request as seen by the mock ingest endpoint.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: &'static str,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct IngestState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    hold_gate: Arc<Notify>,
}

/// Mock ingest server the stage POSTs to. Routes:
/// `/ingest` answers 200, `/created` answers 201, `/reject` answers 503,
/// `/hold` answers 200 only after [`MockIngest::release_hold`].
pub struct MockIngest {
    state: IngestState,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MockIngest {
    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().await.clone()
    }

    // notify_one stores a permit, so a release racing the handler still
    // unblocks it.
    pub fn release_hold(&self) {
        self.state.hold_gate.notify_one();
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// Find an available TCP port
pub async fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Best-effort check for whether binding to loopback is permitted in the current sandbox.
pub async fn can_bind_loopback() -> bool {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(_) => true, // treat other errors as non-fatal for skipping
    }
}

/// Spawn the mock ingest server, return (server handle, base URL)
pub async fn spawn_mock_ingest() -> (MockIngest, String) {
    let state = IngestState {
        requests: Arc::new(Mutex::new(Vec::new())),
        hold_gate: Arc::new(Notify::new()),
    };

    let app = Router::new()
        .route("/ingest", post(ingest))
        .route("/created", post(created))
        .route("/reject", post(reject))
        .route("/hold", post(hold))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock ingest listener");
    let port = listener.local_addr().unwrap().port();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = server.await {
            eprintln!("mock ingest server error: {}", err);
        }
    });

    (
        MockIngest {
            state,
            shutdown_tx,
            handle,
        },
        format!("http://127.0.0.1:{}", port),
    )
}

/// Poll `check` until it returns true or the attempt budget runs out.
pub async fn poll_until<F, Fut>(what: &str, check: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..WAIT_ATTEMPTS {
        if check().await {
            return;
        }
        tokio::time::sleep(WAIT_DELAY).await;
    }
    panic!("timed out waiting for {}", what);
}

async fn capture(state: &IngestState, path: &'static str, headers: &HeaderMap, body: Bytes) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.requests.lock().await.push(CapturedRequest {
        path,
        content_type,
        body,
    });
}

async fn ingest(State(state): State<IngestState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    capture(&state, "/ingest", &headers, body).await;
    StatusCode::OK
}

async fn created(State(state): State<IngestState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    capture(&state, "/created", &headers, body).await;
    StatusCode::CREATED
}

async fn reject(State(state): State<IngestState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    capture(&state, "/reject", &headers, body).await;
    StatusCode::SERVICE_UNAVAILABLE
}

async fn hold(State(state): State<IngestState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    // Capture first so tests can see the request arrive while the
    // response is still held back.
    capture(&state, "/hold", &headers, body).await;
    state.hold_gate.notified().await;
    StatusCode::OK
}
