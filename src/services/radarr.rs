//! Radarr adapter: movie library, release search and queue.

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

/// Whether a movie has a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieFileState {
    Downloaded,
    Missing,
}

impl MovieFileState {
    pub fn from_has_file(has_file: bool) -> Self {
        if has_file {
            MovieFileState::Downloaded
        } else {
            MovieFileState::Missing
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MovieFileState::Downloaded => "Downloaded",
            MovieFileState::Missing => "Missing",
        }
    }
}

impl std::fmt::Display for MovieFileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Movie {
    id: i64,
    title: String,
    #[serde(default)]
    year: Option<i64>,
    has_file: bool,
    monitored: bool,
    #[serde(default)]
    path: Option<String>,
}

impl Movie {
    fn file_state(&self) -> MovieFileState {
        MovieFileState::from_has_file(self.has_file)
    }

    fn line(&self) -> String {
        let unmonitored = if self.monitored { "" } else { " [unmonitored]" };
        format!(
            "  [{}] {} ({}) - {}{}",
            self.id,
            self.title,
            self.year.unwrap_or(0),
            self.file_state().label().to_lowercase(),
            unmonitored
        )
    }

    fn details(&self) -> String {
        let heading = match self.year {
            Some(year) => format!("**{}** ({})", self.title, year),
            None => format!("**{}**", self.title),
        };
        format!(
            "{}\nID: {}\nStatus: {}\nMonitored: {}\nPath: {}",
            heading,
            self.id,
            self.file_state(),
            self.monitored,
            self.path.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoviesSearchCommand {
    name: &'static str,
    movie_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GrabRelease<'a> {
    guid: &'a str,
    indexer_id: i64,
    movie_id: i64,
}

/// Radarr movie download automation.
#[derive(Debug, Clone)]
pub struct Radarr {
    client: ServiceClient,
}

impl Radarr {
    pub fn new(settings: &ServiceSettings, http: UpstreamClient) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(Service::Radarr, settings, http)?,
        })
    }

    /// List every movie in the library.
    #[instrument(skip(self))]
    pub async fn list_movies(&self) -> Result<String> {
        let movies: Vec<Movie> = self.client.get_json("/movie", &[]).await?;

        let mut lines = vec![format!("Movies in Radarr ({}):\n", movies.len())];
        lines.extend(movies.iter().map(Movie::line));
        Ok(lines.join("\n"))
    }

    /// Details for one movie.
    #[instrument(skip(self))]
    pub async fn get_movie(&self, movie_id: i64) -> Result<String> {
        let movie: Movie = self
            .client
            .get_json(&format!("/movie/{}", movie_id), &[])
            .await?;
        Ok(movie.details())
    }

    /// Trigger an automatic search for the movie.
    #[instrument(skip(self))]
    pub async fn search_movie(&self, movie_id: i64) -> Result<String> {
        let command = MoviesSearchCommand {
            name: "MoviesSearch",
            movie_ids: vec![movie_id],
        };
        let raw = self.client.post_raw("/command", &command).await?;
        Ok(command_confirmation(&raw))
    }

    /// Interactive search: list candidate releases.
    #[instrument(skip(self))]
    pub async fn get_releases(&self, movie_id: i64) -> Result<String> {
        let releases: Vec<Release> = self
            .client
            .get_json("/release", &[("movieId", movie_id.to_string())])
            .await?;
        Ok(format_releases(&releases))
    }

    /// Grab a release found by [`Radarr::get_releases`].
    #[instrument(skip(self))]
    pub async fn download_release(&self, guid: &str, indexer_id: i64, movie_id: i64) -> Result<String> {
        let grab = GrabRelease {
            guid,
            indexer_id,
            movie_id,
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
impl Upstream for Radarr {
    fn service(&self) -> Service {
        Service::Radarr
    }

    fn base_url(&self) -> &str {
        self.client.base_url()
    }

    async fn system_status(&self) -> Result<SystemStatus> {
        self.client.get_json("/system/status", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UltimarrError;
    use crate::test_support::{StubRoute, StubServer};
    use serde_json::json;

    fn adapter(stub: &StubServer) -> Radarr {
        Radarr::new(&stub.settings().radarr, UpstreamClient::new().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_list_movies() {
        let body = json!([
            {"id": 1, "title": "Heat", "year": 1995, "hasFile": true, "monitored": true},
            {"id": 2, "title": "Dune", "year": 2021, "hasFile": false, "monitored": false}
        ]);
        let stub = StubServer::start(vec![StubRoute::json("GET", "/api/v3/movie", &body)]).await;

        let out = adapter(&stub).list_movies().await.unwrap();
        assert_eq!(
            out,
            "Movies in Radarr (2):\n\n  [1] Heat (1995) - downloaded\n  [2] Dune (2021) - missing [unmonitored]"
        );
    }

    #[tokio::test]
    async fn test_get_movie_without_path() {
        let body = json!({"id": 9, "title": "Heat", "year": 1995, "hasFile": false, "monitored": true});
        let stub = StubServer::start(vec![StubRoute::json("GET", "/api/v3/movie/9", &body)]).await;

        let out = adapter(&stub).get_movie(9).await.unwrap();
        assert_eq!(
            out,
            "**Heat** (1995)\nID: 9\nStatus: Missing\nMonitored: true\nPath: "
        );
    }

    #[tokio::test]
    async fn test_get_movie_wrong_type_is_malformed() {
        let body = json!({"id": 9, "title": "Heat", "hasFile": "yes", "monitored": true});
        let stub = StubServer::start(vec![StubRoute::json("GET", "/api/v3/movie/9", &body)]).await;

        let err = adapter(&stub).get_movie(9).await.unwrap_err();
        assert!(matches!(err, UltimarrError::MalformedResponse { service: "Radarr", .. }));
    }

    #[tokio::test]
    async fn test_search_movie_posts_movie_ids() {
        let stub = StubServer::start(vec![StubRoute::json("POST", "/api/v3/command", &json!({"id": 3}))]).await;

        let out = adapter(&stub).search_movie(9).await.unwrap();
        assert_eq!(out, "Search triggered. Command ID: 3");
        assert_eq!(
            stub.requests()[0].json_body(),
            json!({"name": "MoviesSearch", "movieIds": [9]})
        );
    }

    #[tokio::test]
    async fn test_get_releases_queries_movie_id() {
        let body = json!([{
            "guid": "g1", "title": "Heat.1995.1080p", "size": 10485760,
            "seeders": 12, "indexerId": 2, "indexer": "Tracker"
        }]);
        let stub = StubServer::start(vec![StubRoute::json("GET", "/api/v3/release", &body)]).await;

        let out = adapter(&stub).get_releases(9).await.unwrap();
        assert!(out.contains("  [12 seeders] Heat.1995.1080p (10MB) - Tracker"));
        assert!(out.contains("    GUID: g1 | Indexer: 2"));
        assert_eq!(stub.requests()[0].query.as_deref(), Some("movieId=9"));
    }

    #[tokio::test]
    async fn test_download_release_posts_grab() {
        let stub = StubServer::start(vec![StubRoute::json(
            "POST",
            "/api/v3/release",
            &json!({"title": "Heat.1995.1080p"}),
        )])
        .await;

        let out = adapter(&stub).download_release("g1", 2, 9).await.unwrap();
        assert_eq!(out, "Download started successfully: Heat.1995.1080p");
        assert_eq!(
            stub.requests()[0].json_body(),
            json!({"guid": "g1", "indexerId": 2, "movieId": 9})
        );
    }

    #[tokio::test]
    async fn test_queue() {
        let body = json!({"records": [{"title": "Dune.2021", "status": "downloading", "sizeleft": 2097152.0}]});
        let stub = StubServer::start(vec![StubRoute::json("GET", "/api/v3/queue", &body)]).await;

        let out = adapter(&stub).queue().await.unwrap();
        assert_eq!(out, "Download Queue (1 items):\n\n  Dune.2021 - downloading (2MB left)");
    }
}
