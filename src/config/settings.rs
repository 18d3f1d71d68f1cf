//! Configuration settings for Ultimarr.

use crate::error::{Result, UltimarrError};
use serde::{Deserialize, Serialize};

/// Upstream services fronted by Ultimarr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Jellyseerr discovery and request service.
    Jellyseerr,
    /// Sonarr series download automation.
    Sonarr,
    /// Radarr movie download automation.
    Radarr,
}

impl Service {
    /// All services, in registration order.
    pub const ALL: [Service; 3] = [Service::Jellyseerr, Service::Sonarr, Service::Radarr];

    /// Human-readable service name.
    pub fn name(self) -> &'static str {
        match self {
            Service::Jellyseerr => "Jellyseerr",
            Service::Sonarr => "Sonarr",
            Service::Radarr => "Radarr",
        }
    }

    /// Versioned REST prefix appended to the base URL.
    pub fn api_prefix(self) -> &'static str {
        match self {
            Service::Jellyseerr => "/api/v1",
            Service::Sonarr | Service::Radarr => "/api/v3",
        }
    }

    /// Environment variable holding the base URL.
    pub fn url_var(self) -> &'static str {
        match self {
            Service::Jellyseerr => "JELLYSEERR_URL",
            Service::Sonarr => "SONARR_URL",
            Service::Radarr => "RADARR_URL",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Service::Jellyseerr => "JELLYSEERR_API_KEY",
            Service::Sonarr => "SONARR_API_KEY",
            Service::Radarr => "RADARR_API_KEY",
        }
    }

    /// Base URL used when the environment does not provide one.
    pub fn default_url(self) -> &'static str {
        match self {
            Service::Jellyseerr => "http://localhost:5055",
            Service::Sonarr => "http://localhost:8989",
            Service::Radarr => "http://localhost:7878",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Connection settings for a single upstream service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSettings {
    /// Base URL without trailing slash (e.g. `http://localhost:8989`).
    pub url: String,
    /// API key sent as `X-Api-Key`.
    pub api_key: String,
}

impl ServiceSettings {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Root configuration structure.
///
/// Built once at startup and never mutated afterwards; adapters receive
/// their slice of it by reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub jellyseerr: ServiceSettings,
    pub sonarr: ServiceSettings,
    pub radarr: ServiceSettings,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Empty values count as unset. Every missing API key is reported in a
    /// single error so the operator can fix them all at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut load = |service: Service| -> Result<ServiceSettings> {
            let url = match value(service.url_var()) {
                Some(url) => normalize_url(service, &url)?,
                None => service.default_url().to_string(),
            };
            let api_key = value(service.api_key_var()).unwrap_or_else(|| {
                missing.push(service.api_key_var());
                String::new()
            });
            Ok(ServiceSettings::new(url, api_key))
        };

        let jellyseerr = load(Service::Jellyseerr)?;
        let sonarr = load(Service::Sonarr)?;
        let radarr = load(Service::Radarr)?;

        if !missing.is_empty() {
            return Err(UltimarrError::Config(format!(
                "{} not set. Export the API key for each service before starting.",
                missing.join(", ")
            )));
        }

        Ok(Self {
            jellyseerr,
            sonarr,
            radarr,
        })
    }

    /// Settings for the given service.
    pub fn service(&self, service: Service) -> &ServiceSettings {
        match service {
            Service::Jellyseerr => &self.jellyseerr,
            Service::Sonarr => &self.sonarr,
            Service::Radarr => &self.radarr,
        }
    }

    /// Copy of these settings with every API key masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |s: &ServiceSettings| ServiceSettings::new(s.url.clone(), mask_key(&s.api_key));
        Self {
            jellyseerr: mask(&self.jellyseerr),
            sonarr: mask(&self.sonarr),
            radarr: mask(&self.radarr),
        }
    }

    /// Render the redacted settings as TOML.
    pub fn to_redacted_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}

/// Validate a base URL and strip any trailing slash.
fn normalize_url(service: Service, raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|e| {
        UltimarrError::Config(format!("{} is not a valid URL ({}): {}", service.url_var(), trimmed, e))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(UltimarrError::Config(format!(
            "{} must use http or https, got '{}'",
            service.url_var(),
            other
        ))),
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("********{}", tail)
}
