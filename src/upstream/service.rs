//! Per-service request helper.

use super::{UpstreamClient, UpstreamRequest};
use crate::config::{Service, ServiceSettings};
use crate::error::{Result, UltimarrError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

const API_KEY_HEADER: &str = "x-api-key";

/// Client bound to one upstream: base URL, API prefix and key.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: Service,
    base: String,
    headers: HeaderMap,
    http: UpstreamClient,
}

impl ServiceClient {
    /// Create a client for `service` from its settings.
    pub fn new(service: Service, settings: &ServiceSettings, http: UpstreamClient) -> Result<Self> {
        let base = format!(
            "{}{}",
            settings.url.trim_end_matches('/'),
            service.api_prefix()
        );
        Url::parse(&base).map_err(|e| {
            UltimarrError::Config(format!("Invalid {} URL '{}': {}", service, base, e))
        })?;

        let mut key = HeaderValue::from_str(&settings.api_key).map_err(|_| {
            UltimarrError::Config(format!(
                "{} contains characters not allowed in an HTTP header",
                service.api_key_var()
            ))
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            service,
            base,
            headers,
            http,
        })
    }

    pub fn service(&self) -> Service {
        self.service
    }

    /// Base URL including the API prefix.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Build the full URL for `path`, form-encoding the query pairs.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base, path)).map_err(|e| {
            UltimarrError::Config(format!("Invalid {} endpoint '{}': {}", self.service, path, e))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path, query)?;
        let body = self
            .http
            .perform(UpstreamRequest::new(Method::GET, url, self.headers.clone()))
            .await?;
        self.decode(&body)
    }

    /// POST a JSON payload to `path` and return the raw response body.
    pub async fn post_raw<B: Serialize + ?Sized>(&self, path: &str, payload: &B) -> Result<Vec<u8>> {
        let url = self.endpoint(path, &[])?;
        let body = serde_json::to_vec(payload)?;
        self.http
            .perform(UpstreamRequest::new(Method::POST, url, self.headers.clone()).with_body(body))
            .await
    }

    /// POST a JSON payload to `path` and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.post_raw(path, payload).await?;
        self.decode(&body)
    }

    /// Decode a response body, attributing failures to this service.
    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T> {
        serde_json::from_slice(body).map_err(|e| UltimarrError::MalformedResponse {
            service: self.service.name(),
            message: e.to_string(),
        })
    }
}
