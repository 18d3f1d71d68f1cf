//! Response shapes and projections shared by Sonarr and Radarr.

use super::{bytes_to_mb, display_id, truncate_chars};
use serde::Deserialize;
use serde_json::Value;

/// Maximum number of releases listed before the "... and N more" trailer.
pub const RELEASE_DISPLAY_LIMIT: usize = 20;

/// Release titles are cut to this many characters in listings.
pub const RELEASE_TITLE_WIDTH: usize = 60;

/// A candidate release from an interactive search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub guid: String,
    pub title: String,
    pub size: u64,
    #[serde(default)]
    pub seeders: Option<i64>,
    pub indexer_id: i64,
    pub indexer: String,
}

/// One page of the download queue.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QueuePage {
    #[serde(default)]
    pub records: Vec<QueueRecord>,
}

/// An in-progress download.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueRecord {
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub sizeleft: Option<f64>,
}

pub(crate) fn format_releases(releases: &[Release]) -> String {
    let mut lines = vec![format!("Available releases ({}):\n", releases.len())];

    for (i, release) in releases.iter().enumerate() {
        if i >= RELEASE_DISPLAY_LIMIT {
            lines.push(format!(
                "\n  ... and {} more",
                releases.len() - RELEASE_DISPLAY_LIMIT
            ));
            break;
        }
        lines.push(format!(
            "  [{} seeders] {} ({}MB) - {}\n    GUID: {} | Indexer: {}",
            release.seeders.unwrap_or(0),
            truncate_chars(&release.title, RELEASE_TITLE_WIDTH),
            bytes_to_mb(release.size),
            release.indexer,
            release.guid,
            release.indexer_id
        ));
    }

    lines.join("\n")
}

pub(crate) fn format_queue(records: &[QueueRecord]) -> String {
    let mut lines = vec![format!("Download Queue ({} items):\n", records.len())];

    for record in records {
        let left = record.sizeleft.map(|s| s.max(0.0) as u64).unwrap_or(0);
        lines.push(format!(
            "  {} - {} ({}MB left)",
            record.title,
            record.status,
            bytes_to_mb(left)
        ));
    }

    if records.is_empty() {
        lines.push("  (empty)".to_string());
    }

    lines.join("\n")
}

/// Confirmation for a search command, falling back to the raw body.
pub(crate) fn command_confirmation(raw: &[u8]) -> String {
    match response_field(raw, "id") {
        Some(id) => format!("Search triggered. Command ID: {}", display_id(&id)),
        None => format!("Search triggered. Response: {}", String::from_utf8_lossy(raw)),
    }
}

/// Confirmation for a grabbed release.
pub(crate) fn download_confirmation(raw: &[u8]) -> String {
    match response_field(raw, "title") {
        Some(Value::String(title)) => format!("Download started successfully: {}", title),
        _ => "Download started successfully".to_string(),
    }
}

/// Non-null top-level field of a JSON object body, if any.
pub(crate) fn response_field(raw: &[u8], field: &str) -> Option<Value> {
    serde_json::from_slice::<Value>(raw)
        .ok()
        .and_then(|v| v.get(field).cloned())
        .filter(|v| !v.is_null())
}
