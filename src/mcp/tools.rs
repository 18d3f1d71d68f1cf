//! MCP tool definitions for Ultimarr.
//!
//! Every tool validates its arguments before touching the network, so an
//! invalid call never reaches an upstream.

use super::registry::{Arguments, ParamKind, ToolDescriptor, ToolRegistry};
use crate::services::{Jellyseerr, MediaType, Radarr, Services, Sonarr};

/// Default `take` for `jellyseerr_list_requests`.
const DEFAULT_REQUEST_LIMIT: u64 = 20;

/// Build the registry with every Jellyseerr, Sonarr and Radarr tool.
pub fn build_tool_registry(services: &Services) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_jellyseerr_tools(&mut registry, &services.jellyseerr);
    register_sonarr_tools(&mut registry, &services.sonarr);
    register_radarr_tools(&mut registry, &services.radarr);
    registry
}

fn register_jellyseerr_tools(registry: &mut ToolRegistry, jellyseerr: &Jellyseerr) {
    let client = jellyseerr.clone();
    registry.register(
        ToolDescriptor::new(
            "jellyseerr_search",
            "Search for movies and TV shows on Jellyseerr",
        )
        .required("query", ParamKind::String, "Search query"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let query = args.required_str("query")?;
                client.search(query).await
            }
        },
    );

    let client = jellyseerr.clone();
    registry.register(
        ToolDescriptor::new(
            "jellyseerr_request",
            "Request a movie or TV show on Jellyseerr",
        )
        .required("tmdb_id", ParamKind::Number, "TMDB ID of the media")
        .required(
            "media_type",
            ParamKind::Enum(&MediaType::VALUES),
            "Type: 'movie' or 'tv'",
        ),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let tmdb_id = args.required_id("tmdb_id")?;
                let media_type =
                    args.required_enum("media_type", &MediaType::VALUES, MediaType::parse)?;
                client.request(tmdb_id, media_type).await
            }
        },
    );

    let client = jellyseerr.clone();
    registry.register(
        ToolDescriptor::new("jellyseerr_list_requests", "List media requests on Jellyseerr")
            .optional(
                "limit",
                ParamKind::Number,
                "Number of requests to return (default 20)",
            ),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let limit = args.optional_limit("limit", DEFAULT_REQUEST_LIMIT)?;
                client.list_requests(limit).await
            }
        },
    );
}

fn register_sonarr_tools(registry: &mut ToolRegistry, sonarr: &Sonarr) {
    let client = sonarr.clone();
    registry.register(
        ToolDescriptor::new("sonarr_list_series", "List all TV series in Sonarr"),
        move |_: Arguments| {
            let client = client.clone();
            async move { client.list_series().await }
        },
    );

    let client = sonarr.clone();
    registry.register(
        ToolDescriptor::new(
            "sonarr_get_series",
            "Get details for a specific series in Sonarr",
        )
        .required("series_id", ParamKind::Number, "Sonarr series ID"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let series_id = args.required_id("series_id")?;
                client.get_series(series_id).await
            }
        },
    );

    let client = sonarr.clone();
    registry.register(
        ToolDescriptor::new(
            "sonarr_search_series",
            "Trigger a search for releases for a series in Sonarr",
        )
        .required("series_id", ParamKind::Number, "Sonarr series ID"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let series_id = args.required_id("series_id")?;
                client.search_series(series_id).await
            }
        },
    );

    let client = sonarr.clone();
    registry.register(
        ToolDescriptor::new(
            "sonarr_get_releases",
            "Get available releases for a series (interactive search)",
        )
        .required("series_id", ParamKind::Number, "Sonarr series ID")
        .optional(
            "season",
            ParamKind::Number,
            "Season number (optional, omit for all)",
        ),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let series_id = args.required_id("series_id")?;
                let season = args.optional_id("season")?;
                client.get_releases(series_id, season).await
            }
        },
    );

    let client = sonarr.clone();
    registry.register(
        ToolDescriptor::new("sonarr_download_release", "Download a specific release by GUID")
            .required(
                "guid",
                ParamKind::String,
                "Release GUID from sonarr_get_releases",
            )
            .required("indexer_id", ParamKind::Number, "Indexer ID from the release")
            .required("series_id", ParamKind::Number, "Sonarr series ID"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let guid = args.required_str("guid")?;
                let indexer_id = args.required_id("indexer_id")?;
                let series_id = args.required_id("series_id")?;
                client.download_release(guid, indexer_id, series_id).await
            }
        },
    );

    let client = sonarr.clone();
    registry.register(
        ToolDescriptor::new("sonarr_queue", "Get current download queue in Sonarr"),
        move |_: Arguments| {
            let client = client.clone();
            async move { client.queue().await }
        },
    );
}

fn register_radarr_tools(registry: &mut ToolRegistry, radarr: &Radarr) {
    let client = radarr.clone();
    registry.register(
        ToolDescriptor::new("radarr_list_movies", "List all movies in Radarr"),
        move |_: Arguments| {
            let client = client.clone();
            async move { client.list_movies().await }
        },
    );

    let client = radarr.clone();
    registry.register(
        ToolDescriptor::new(
            "radarr_get_movie",
            "Get details for a specific movie in Radarr",
        )
        .required("movie_id", ParamKind::Number, "Radarr movie ID"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let movie_id = args.required_id("movie_id")?;
                client.get_movie(movie_id).await
            }
        },
    );

    let client = radarr.clone();
    registry.register(
        ToolDescriptor::new(
            "radarr_search_movie",
            "Trigger a search for releases for a movie in Radarr",
        )
        .required("movie_id", ParamKind::Number, "Radarr movie ID"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let movie_id = args.required_id("movie_id")?;
                client.search_movie(movie_id).await
            }
        },
    );

    let client = radarr.clone();
    registry.register(
        ToolDescriptor::new(
            "radarr_get_releases",
            "Get available releases for a movie (interactive search)",
        )
        .required("movie_id", ParamKind::Number, "Radarr movie ID"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let movie_id = args.required_id("movie_id")?;
                client.get_releases(movie_id).await
            }
        },
    );

    let client = radarr.clone();
    registry.register(
        ToolDescriptor::new("radarr_download_release", "Download a specific release by GUID")
            .required(
                "guid",
                ParamKind::String,
                "Release GUID from radarr_get_releases",
            )
            .required("indexer_id", ParamKind::Number, "Indexer ID from the release")
            .required("movie_id", ParamKind::Number, "Radarr movie ID"),
        move |args: Arguments| {
            let client = client.clone();
            async move {
                let guid = args.required_str("guid")?;
                let indexer_id = args.required_id("indexer_id")?;
                let movie_id = args.required_id("movie_id")?;
                client.download_release(guid, indexer_id, movie_id).await
            }
        },
    );

    let client = radarr.clone();
    registry.register(
        ToolDescriptor::new("radarr_queue", "Get current download queue in Radarr"),
        move |_: Arguments| {
            let client = client.clone();
            async move { client.queue().await }
        },
    );
}
