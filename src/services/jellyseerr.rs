//! Jellyseerr adapter: search, request and list requests.

use super::arr::response_field;
use super::{display_id, SystemStatus, Upstream};
use crate::config::{Service, ServiceSettings};
use crate::error::Result;
use crate::upstream::{ServiceClient, UpstreamClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Maximum number of search results listed.
pub const SEARCH_DISPLAY_LIMIT: usize = 15;

/// Kind of media that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Accepted argument values.
    pub const VALUES: [&'static str; 2] = ["movie", "tv"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(MediaType::Movie),
            "tv" => Some(MediaType::Tv),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

/// Availability of a title on the media server (`mediaInfo.status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Pending,
    Processing,
    Available,
    Partial,
}

impl MediaStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(MediaStatus::Pending),
            3 => Some(MediaStatus::Processing),
            4 => Some(MediaStatus::Available),
            5 => Some(MediaStatus::Partial),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaStatus::Pending => "Pending",
            MediaStatus::Processing => "Processing",
            MediaStatus::Available => "Available",
            MediaStatus::Partial => "Partial",
        }
    }
}

/// Approval state of a media request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
    Failed,
    Completed,
    Unknown,
}

impl RequestStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => RequestStatus::Pending,
            2 => RequestStatus::Approved,
            3 => RequestStatus::Declined,
            4 => RequestStatus::Failed,
            5 => RequestStatus::Completed,
            _ => RequestStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Declined => "Declined",
            RequestStatus::Failed => "Failed",
            RequestStatus::Completed => "Completed",
            RequestStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    id: i64,
    media_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    media_info: Option<MediaInfo>,
}

#[derive(Debug, Deserialize)]
struct MediaInfo {
    #[serde(default)]
    status: Option<i64>,
}

impl SearchResult {
    fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }

    /// Year from the first air date, falling back to the release date.
    fn year(&self) -> &str {
        [&self.first_air_date, &self.release_date]
            .into_iter()
            .flatten()
            .find_map(|date| date.get(..4))
            .unwrap_or_default()
    }

    fn status(&self) -> Option<MediaStatus> {
        self.media_info
            .as_ref()
            .and_then(|info| info.status)
            .and_then(MediaStatus::from_code)
    }

    fn line(&self) -> String {
        let mut line = format!(
            "  [{}] {} ({}) - TMDB: {}",
            self.media_type.to_uppercase(),
            self.display_name(),
            self.year(),
            self.id
        );
        if let Some(status) = self.status() {
            line.push_str(&format!(" [{}]", status.label()));
        }
        line
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPayload {
    media_type: &'static str,
    media_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seasons: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct RequestPage {
    #[serde(default)]
    results: Vec<MediaRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaRequest {
    id: i64,
    status: i64,
    media: RequestedMedia,
    #[serde(default)]
    requested_by: Option<RequestUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestedMedia {
    media_type: String,
    tmdb_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestUser {
    #[serde(default)]
    display_name: Option<String>,
}

impl MediaRequest {
    fn line(&self) -> String {
        let user = self
            .requested_by
            .as_ref()
            .and_then(|u| u.display_name.as_deref())
            .unwrap_or("Unknown");
        format!(
            "  #{} [{}] {} (TMDB: {}) - by {}",
            self.id,
            RequestStatus::from_code(self.status).label(),
            self.media.media_type,
            self.media.tmdb_id,
            user
        )
    }
}

/// Jellyseerr discovery and request service.
#[derive(Debug, Clone)]
pub struct Jellyseerr {
    client: ServiceClient,
}

impl Jellyseerr {
    pub fn new(settings: &ServiceSettings, http: UpstreamClient) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(Service::Jellyseerr, settings, http)?,
        })
    }

    /// Search movies and TV shows.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<String> {
        let page: SearchPage = self
            .client
            .get_json("/search", &[("query", query.to_string())])
            .await?;

        let mut lines = vec![format!("Found {} results:\n", page.results.len())];
        lines.extend(
            page.results
                .iter()
                .take(SEARCH_DISPLAY_LIMIT)
                .map(SearchResult::line),
        );
        Ok(lines.join("\n"))
    }

    /// Request a movie, or every season of a TV show.
    #[instrument(skip(self))]
    pub async fn request(&self, tmdb_id: i64, media_type: MediaType) -> Result<String> {
        let payload = RequestPayload {
            media_type: media_type.as_str(),
            media_id: tmdb_id,
            seasons: (media_type == MediaType::Tv).then_some("all"),
        };
        let raw = self.client.post_raw("/request", &payload).await?;

        Ok(match response_field(&raw, "id") {
            Some(id) => format!("Request created successfully. Request ID: {}", display_id(&id)),
            None => format!("Response: {}", String::from_utf8_lossy(&raw)),
        })
    }

    /// List the most recent media requests.
    #[instrument(skip(self))]
    pub async fn list_requests(&self, limit: u64) -> Result<String> {
        let page: RequestPage = self
            .client
            .get_json("/request", &[("take", limit.to_string())])
            .await?;

        let mut lines = vec![format!("Requests ({}):\n", page.results.len())];
        lines.extend(page.results.iter().map(MediaRequest::line));
        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl Upstream for Jellyseerr {
    fn service(&self) -> Service {
        Service::Jellyseerr
    }

    fn base_url(&self) -> &str {
        self.client.base_url()
    }

    async fn system_status(&self) -> Result<SystemStatus> {
        self.client.get_json("/status", &[]).await
    }
}
