//! Application configuration.

use crate::error::{AppError, AppResult};
use dashgrid_core::ApiBase;
use dashgrid_layout::{Theme, Viewport};
use dashgrid_stream::DEFAULT_TOPIC;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Push channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Open the push subscription at startup.
    #[serde(default = "default_stream_enabled")]
    pub enabled: bool,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_stream_enabled() -> bool {
    true
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            enabled: default_stream_enabled(),
            topic: default_topic(),
        }
    }
}

/// Settings of the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page location every API address is derived from.
    #[serde(default = "default_page_location")]
    pub page_location: String,
    /// JSON layout file.
    #[serde(default = "default_layout_path")]
    pub layout_path: String,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub theme: Theme,
    /// Heartbeat period (ms). Default: 1,000.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// HTTP request timeout (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_page_location() -> String {
    "http://localhost:18881/".to_string()
}

fn default_layout_path() -> String {
    "config/layout.json".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_location: default_page_location(),
            layout_path: default_layout_path(),
            stream: StreamSettings::default(),
            viewport: Viewport::default(),
            theme: Theme::default(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load from `DASHGRID_CONFIG` or `config/default.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> AppResult<Self> {
        let config_path = std::env::var("DASHGRID_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn api_base(&self) -> AppResult<ApiBase> {
        Ok(ApiBase::from_page_location(&self.page_location)?)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
