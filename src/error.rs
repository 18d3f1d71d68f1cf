//! Error types for Ultimarr.

use thiserror::Error;

/// Library-level error type for Ultimarr operations.
#[derive(Error, Debug)]
pub enum UltimarrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Transport error: {}", error_chain(.0))]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("Malformed response from {service}: {message}")]
    MalformedResponse {
        service: &'static str,
        message: String,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl UltimarrError {
    /// Build an `InvalidArgument` error for the named argument.
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        UltimarrError::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Render an error followed by every distinct cause in its source chain.
///
/// `reqwest` keeps the interesting part (refused, timed out, DNS) in the
/// sources, not in its own message.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Result type alias for Ultimarr operations.
pub type Result<T> = std::result::Result<T, UltimarrError>;
