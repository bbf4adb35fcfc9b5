//! In-process mock targets for tests.
//!
//! Each mock is a small axum server bound on `127.0.0.1:0` that serves the
//! default dataset and auth paths from a scripted queue of replies and
//! records every request it receives.

use std::collections::VecDeque;
use std::future::IntoFuture;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;

use crate::config::{CommonConfig, TargetConfig};

/// A request received by a mock target.
#[derive(Debug, Clone)]
pub struct Captured {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Scripted replies for a mock target.
///
/// Queued replies are served in order; once a queue is empty the fallback
/// is used. The auth fallback issues `token-1`, `token-2`, ... per call.
pub struct Script {
    dataset: VecDeque<(u16, String)>,
    dataset_fallback: (u16, String),
    auth: VecDeque<(u16, String)>,
    auth_fallback: Option<(u16, String)>,
}

impl Script {
    pub fn new() -> Self {
        Self {
            dataset: VecDeque::new(),
            dataset_fallback: (500, "unscripted".to_string()),
            auth: VecDeque::new(),
            auth_fallback: None,
        }
    }

    pub fn dataset(mut self, status: u16, body: impl Into<String>) -> Self {
        self.dataset.push_back((status, body.into()));
        self
    }

    pub fn dataset_always(mut self, status: u16, body: impl Into<String>) -> Self {
        self.dataset_fallback = (status, body.into());
        self
    }

    pub fn auth(mut self, status: u16, body: impl Into<String>) -> Self {
        self.auth.push_back((status, body.into()));
        self
    }

    pub fn auth_always(mut self, status: u16, body: impl Into<String>) -> Self {
        self.auth_fallback = Some((status, body.into()));
        self
    }
}

struct MockState {
    script: Mutex<Script>,
    dataset_calls: Mutex<Vec<Captured>>,
    auth_calls: Mutex<Vec<Captured>>,
}

/// A running mock target.
pub struct MockTarget {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockTarget {
    pub async fn start(script: Script) -> Self {
        let state = Arc::new(MockState {
            script: Mutex::new(script),
            dataset_calls: Mutex::new(Vec::new()),
            auth_calls: Mutex::new(Vec::new()),
        });

        let common = CommonConfig::default();
        let app = Router::new()
            .route(&common.dataset_path, post(handle_dataset))
            .route(&common.auth_path, post(handle_auth))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, app).into_future());

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Target configuration pointing at this mock.
    pub fn config(&self, name: &str) -> TargetConfig {
        TargetConfig {
            name: name.to_string(),
            host: self.base_url.clone(),
            port: None,
            client_id: format!("{name}-client"),
            client_secret: format!("{name}-secret"),
            api_key: format!("{name}-key"),
        }
    }

    pub fn dataset_calls(&self) -> Vec<Captured> {
        self.state.dataset_calls.lock().unwrap().clone()
    }

    pub fn auth_calls(&self) -> Vec<Captured> {
        self.state.auth_calls.lock().unwrap().clone()
    }
}

fn reply(status: u16, body: String) -> (StatusCode, String) {
    (StatusCode::from_u16(status).unwrap(), body)
}

async fn handle_dataset(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    state
        .dataset_calls
        .lock()
        .unwrap()
        .push(Captured { headers, body });

    let mut script = state.script.lock().unwrap();
    let next = script.dataset.pop_front();
    let (status, body) = next.unwrap_or_else(|| script.dataset_fallback.clone());
    reply(status, body)
}

async fn handle_auth(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let call_number = {
        let mut calls = state.auth_calls.lock().unwrap();
        calls.push(Captured { headers, body });
        calls.len()
    };

    let mut script = state.script.lock().unwrap();
    if let Some((status, body)) = script.auth.pop_front() {
        return reply(status, body);
    }
    match &script.auth_fallback {
        Some((status, body)) => reply(*status, body.clone()),
        None => reply(200, format!(r#"{{"access_token":"token-{call_number}"}}"#)),
    }
}
