//! Upstream service adapters.
//!
//! Each adapter owns a [`ServiceClient`](crate::upstream::ServiceClient),
//! decodes responses into typed records and projects them into the text
//! returned to the MCP client.

mod arr;
mod jellyseerr;
mod radarr;
mod sonarr;

pub use arr::{QueueRecord, Release, RELEASE_DISPLAY_LIMIT, RELEASE_TITLE_WIDTH};
pub use jellyseerr::{Jellyseerr, MediaStatus, MediaType, RequestStatus, SEARCH_DISPLAY_LIMIT};
pub use radarr::{MovieFileState, Radarr};
pub use sonarr::Sonarr;

use crate::config::{Service, Settings};
use crate::error::Result;
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use serde::Deserialize;

/// Version information reported by an upstream's status endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: String,
    #[serde(default)]
    pub app_name: Option<String>,
}

/// Common surface of every adapter, used for health checks.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Which service this adapter talks to.
    fn service(&self) -> Service;

    /// Base URL including the API prefix.
    fn base_url(&self) -> &str;

    /// Query the upstream's status endpoint.
    async fn system_status(&self) -> Result<SystemStatus>;
}

/// The three adapters, sharing one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct Services {
    pub jellyseerr: Jellyseerr,
    pub sonarr: Sonarr,
    pub radarr: Radarr,
}

impl Services {
    /// Build every adapter from the startup settings.
    pub fn connect(settings: &Settings) -> Result<Self> {
        Self::with_client(settings, UpstreamClient::new()?)
    }

    /// Build every adapter around an existing client.
    pub fn with_client(settings: &Settings, http: UpstreamClient) -> Result<Self> {
        Ok(Self {
            jellyseerr: Jellyseerr::new(settings.service(Service::Jellyseerr), http.clone())?,
            sonarr: Sonarr::new(settings.service(Service::Sonarr), http.clone())?,
            radarr: Radarr::new(settings.service(Service::Radarr), http)?,
        })
    }

    /// All adapters as trait objects, in service order.
    pub fn upstreams(&self) -> Vec<&dyn Upstream> {
        vec![&self.jellyseerr, &self.sonarr, &self.radarr]
    }
}

/// Cut `s` to at most `width` characters.
pub fn truncate_chars(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Whole mebibytes in `bytes`.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

/// Render an upstream identifier the way it appeared in the JSON.
pub(crate) fn display_id(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_chars() {
        let long = "A".repeat(75);
        assert_eq!(truncate_chars(&long, 60).chars().count(), 60);
        assert_eq!(truncate_chars("Short.Title.1080p", 60), "Short.Title.1080p");
        let exact = "B".repeat(60);
        assert_eq!(truncate_chars(&exact, 60), exact);
        // Multi-byte characters are never split.
        let accented = "é".repeat(70);
        assert_eq!(truncate_chars(&accented, 60).chars().count(), 60);
    }

    #[test]
    fn test_bytes_to_mb() {
        assert_eq!(bytes_to_mb(0), 0);
        assert_eq!(bytes_to_mb(1_048_575), 0);
        assert_eq!(bytes_to_mb(5 * 1024 * 1024 + 10), 5);
    }

    #[test]
    fn test_display_id() {
        assert_eq!(display_id(&json!(42)), "42");
        assert_eq!(display_id(&json!("abc")), "abc");
    }
}
