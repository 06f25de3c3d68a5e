//! Error types for the Scribe engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Main error type for the Scribe engine.
#[derive(Debug, Error)]
pub enum ScribeError {
    /// Network or stream failure, including non-success HTTP responses.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed frame or response body. Fatal to the stream it came from.
    #[error("decode error: {0}")]
    Decode(String),

    /// Rejected input. Never surfaced to the user; submissions failing
    /// validation are dropped silently upstream.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Detail lookup failure. Reported locally, never touches session state.
    #[error("detail lookup failed: {0}")]
    SideFetch(String),

    // Ambient
    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error should mark the in-flight turn as errored.
    /// Transport and decode failures both collapse to that outcome.
    pub fn is_stream_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}

impl From<reqwest::Error> for ScribeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for ScribeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
