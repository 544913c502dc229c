//! Shared test utilities
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aiva::config::EndpointConfig;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use secrecy::SecretString;

/// One request seen by a mock server
#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: serde_json::Value,
    delay: Duration,
    requests: Arc<Mutex<Vec<Captured>>>,
}

/// In-process HTTP server answering every request with one canned response
pub struct MockServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    state.requests.lock().unwrap().push(Captured {
        path: uri.path().to_string(),
        query: uri.query().map(ToString::to_string),
        headers,
        body,
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    (state.status, Json(state.body))
}

/// Start a mock server on an ephemeral loopback port
pub async fn spawn_mock(status: StatusCode, body: serde_json::Value) -> MockServer {
    spawn_mock_with_delay(status, body, Duration::ZERO).await
}

/// Start a mock server that waits `delay` before answering
pub async fn spawn_mock_with_delay(
    status: StatusCode,
    body: serde_json::Value,
    delay: Duration,
) -> MockServer {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status,
        body,
        delay,
        requests: Arc::clone(&requests),
    };

    let router = axum::Router::new().fallback(handle).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock server");
    let addr = listener.local_addr().expect("mock server has no address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    MockServer {
        base_url: format!("http://{addr}"),
        requests,
    }
}

/// Base URL of a loopback port with nothing listening
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let addr = listener.local_addr().expect("no address");
    drop(listener);
    format!("http://{addr}")
}

/// Endpoint pointed at `base_url` with a short timeout
pub fn endpoint(base_url: &str, model: Option<&str>) -> EndpointConfig {
    EndpointConfig {
        base_url: base_url.to_string(),
        model: model.map(ToString::to_string),
        timeout: Duration::from_secs(5),
    }
}

pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}
