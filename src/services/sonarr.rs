//! Sonarr adapter: series library, release search and queue.

use super::arr::{
    command_confirmation, download_confirmation, format_queue, format_releases, QueuePage, Release,
};
use super::{SystemStatus, Upstream};
use crate::config::{Service, ServiceSettings};
use crate::error::Result;
use crate::upstream::{ServiceClient, UpstreamClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Series {
    id: i64,
    title: String,
    #[serde(default)]
    year: Option<i64>,
    status: String,
    monitored: bool,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    statistics: Option<SeriesStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesStatistics {
    #[serde(default)]
    episode_count: Option<i64>,
    #[serde(default)]
    episode_file_count: Option<i64>,
}

impl Series {
    fn line(&self) -> String {
        let unmonitored = if self.monitored { "" } else { " [unmonitored]" };
        format!(
            "  [{}] {} ({}) - {}{}",
            self.id,
            self.title,
            self.year.unwrap_or(0),
            self.status,
            unmonitored
        )
    }

    fn details(&self) -> String {
        let heading = match self.year {
            Some(year) => format!("**{}** ({})", self.title, year),
            None => format!("**{}**", self.title),
        };
        let stats = self.statistics.as_ref();
        let episodes = stats.and_then(|s| s.episode_count).unwrap_or(0);
        let files = stats.and_then(|s| s.episode_file_count).unwrap_or(0);

        format!(
            "{}\nID: {}\nStatus: {}\nMonitored: {}\nPath: {}\nEpisodes: {}/{} downloaded",
            heading,
            self.id,
            self.status,
            self.monitored,
            self.path.as_deref().unwrap_or_default(),
            files,
            episodes
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesSearchCommand {
    name: &'static str,
    series_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GrabRelease<'a> {
    guid: &'a str,
    indexer_id: i64,
    series_id: i64,
}

/// Sonarr series download automation.
#[derive(Debug, Clone)]
pub struct Sonarr {
    client: ServiceClient,
}

impl Sonarr {
    pub fn new(settings: &ServiceSettings, http: UpstreamClient) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(Service::Sonarr, settings, http)?,
        })
    }

    /// List every series in the library.
    #[instrument(skip(self))]
    pub async fn list_series(&self) -> Result<String> {
        let series: Vec<Series> = self.client.get_json("/series", &[]).await?;

        let mut lines = vec![format!("Series in Sonarr ({}):\n", series.len())];
        lines.extend(series.iter().map(Series::line));
        Ok(lines.join("\n"))
    }

    /// Details for one series.
    #[instrument(skip(self))]
    pub async fn get_series(&self, series_id: i64) -> Result<String> {
        let series: Series = self
            .client
            .get_json(&format!("/series/{}", series_id), &[])
            .await?;
        Ok(series.details())
    }

    /// Trigger an automatic search for every missing episode.
    #[instrument(skip(self))]
    pub async fn search_series(&self, series_id: i64) -> Result<String> {
        let command = SeriesSearchCommand {
            name: "SeriesSearch",
            series_id,
        };
        let raw = self.client.post_raw("/command", &command).await?;
        Ok(command_confirmation(&raw))
    }

    /// Interactive search: list candidate releases.
    #[instrument(skip(self))]
    pub async fn get_releases(&self, series_id: i64, season: Option<i64>) -> Result<String> {
        let mut query = vec![("seriesId", series_id.to_string())];
        if let Some(season) = season {
            query.push(("seasonNumber", season.to_string()));
        }
        let releases: Vec<Release> = self.client.get_json("/release", &query).await?;
        Ok(format_releases(&releases))
    }

    /// Grab a release found by [`Sonarr::get_releases`].
    #[instrument(skip(self))]
    pub async fn download_release(&self, guid: &str, indexer_id: i64, series_id: i64) -> Result<String> {
        let grab = GrabRelease {
            guid,
            indexer_id,
            series_id,
        };
        let raw = self.client.post_raw("/release", &grab).await?;
        Ok(download_confirmation(&raw))
    }

    /// Current download queue.
    #[instrument(skip(self))]
    pub async fn queue(&self) -> Result<String> {
        let page: QueuePage = self.client.get_json("/queue", &[]).await?;
        Ok(format_queue(&page.records))
    }
}

#[async_trait]
impl Upstream for Sonarr {
    fn service(&self) -> Service {
        Service::Sonarr
    }

    fn base_url(&self) -> &str {
        self.client.base_url()
    }

    async fn system_status(&self) -> Result<SystemStatus> {
        self.client.get_json("/system/status", &[]).await
    }
}
