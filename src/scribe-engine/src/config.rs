//! Engine configuration.
//!
//! Loaded from `~/.config/scribe/config.toml` when present, with the
//! backend URL overridable through `SCRIBE_API_URL`. Every field has a
//! default so a missing file is not an error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the Scribe engine and UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// Base URL of the templates/chat backend.
    pub api_url: String,
    /// Timeout for non-streaming requests, in seconds. Streaming requests
    /// carry no overall deadline.
    pub request_timeout_secs: u64,
    /// Default tracing filter, overridable with `RUST_LOG`.
    pub log_filter: String,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_filter: "info".to_string(),
        }
    }
}

impl ScribeConfig {
    /// Load configuration: file if present, defaults otherwise, then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        if let Ok(url) = std::env::var("SCRIBE_API_URL") {
            if !url.is_empty() {
                config.api_url = url;
            }
        }
        Ok(config)
    }

    /// Parse a specific config file.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Location of the config file, when a config directory exists.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("scribe").join("config.toml"))
    }
}
