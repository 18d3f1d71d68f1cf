//! Local HTTP stub used by the unit tests in place of real upstreams.

use crate::config::{ServiceSettings, Settings};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A canned response for one method and path (query string ignored).
#[derive(Debug, Clone)]
pub struct StubRoute {
    method: String,
    path: String,
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl StubRoute {
    pub fn new(method: &str, path: &str, status: u16, body: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn ok(method: &str, path: &str, body: &str) -> Self {
        Self::new(method, path, 200, body)
    }

    pub fn json(method: &str, path: &str, body: &Value) -> Self {
        Self::new(method, path, 200, &body.to_string())
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request the stub received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn json_body(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

struct StubState {
    routes: Vec<StubRoute>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// HTTP server on an ephemeral localhost port.
pub struct StubServer {
    port: u16,
    state: Arc<StubState>,
}

impl StubServer {
    pub async fn start(routes: Vec<StubRoute>) -> Self {
        let state = Arc::new(StubState {
            routes,
            requests: Mutex::new(Vec::new()),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { port, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// Settings pointing every service at this stub.
    pub fn settings(&self) -> Settings {
        Settings {
            jellyseerr: ServiceSettings::new(self.base_url(), "jellyseerr-key"),
            sonarr: ServiceSettings::new(self.base_url(), "sonarr-key"),
            radarr: ServiceSettings::new(self.base_url(), "radarr-key"),
        }
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(|q| q.to_string()),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect(),
        body: body.to_vec(),
    });

    let route = state
        .routes
        .iter()
        .find(|r| r.method == method.as_str() && r.path == uri.path())
        .cloned();

    match route {
        Some(route) => {
            if let Some(delay) = route.delay {
                tokio::time::sleep(delay).await;
            }
            let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, [(header::CONTENT_TYPE, "application/json")], route.body)
        }
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            format!("{{\"message\":\"no stub for {} {}\"}}", method, uri.path()),
        ),
    }
}
