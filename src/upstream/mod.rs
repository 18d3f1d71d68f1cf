//! HTTP plumbing shared by every upstream adapter.
//!
//! [`UpstreamClient`] performs exactly one request per call and classifies
//! the outcome; [`ServiceClient`] layers a base path, API key and JSON
//! decoding on top of it for one service.

mod service;

pub use service::ServiceClient;

use crate::error::{Result, UltimarrError};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Timeout covering connect, request and full response body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of body bytes kept in an HTTP error message.
pub const ERROR_BODY_LIMIT: usize = 200;

/// A single outbound request. Built fresh for every call.
#[derive(Debug)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: Url, headers: HeaderMap) -> Self {
        Self {
            method,
            url,
            headers,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// JSON-agnostic HTTP client with a fixed timeout.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Create a client with the default 30 second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ultimarr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Perform the request and return the raw body on a status below 400.
    pub async fn perform(&self, request: UpstreamRequest) -> Result<Vec<u8>> {
        let UpstreamRequest {
            method,
            url,
            headers,
            body,
        } = request;

        debug!(%method, %url, "Upstream request");

        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(%method, %url, error = %e, "Upstream request failed");
            UltimarrError::Transport(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if status.as_u16() >= 400 {
            warn!(%method, %url, status = status.as_u16(), "Upstream returned error status");
            return Err(UltimarrError::UpstreamHttp {
                status: status.as_u16(),
                body: truncate_body(&bytes),
            });
        }

        debug!(status = status.as_u16(), bytes = bytes.len(), "Upstream response");
        Ok(bytes.to_vec())
    }
}

/// First [`ERROR_BODY_LIMIT`] bytes of a body, decoded lossily.
pub fn truncate_body(body: &[u8]) -> String {
    let end = body.len().min(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
