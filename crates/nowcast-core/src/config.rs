//! Dashboard configuration
//!
//! Stored as TOML in `<config_dir>/nowcast/config.toml`. Every field has a
//! default, so a missing file or a partial file both work. The bearer token
//! can also come from `NOWCAST_BEARER_TOKEN`, which wins over the file.

use crate::analytics::BoundaryMode;
use crate::client::{DEFAULT_API_BASE_URL, DEFAULT_REGIONAL_API_URL, TOKEN_ENV};
use crate::error::CoreError;
use crate::playback::{PlaybackConfig, TickDriver};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest accepted step: one day
pub const MAX_STEP_MINUTES: i64 = 24 * 60;

const ANCHOR_STEP_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api_base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// How often the TUI refetches every series
    pub refresh_interval_secs: u64,
    /// Wall-clock time between playback ticks
    pub play_interval_ms: u64,
    /// Logical advance per playback tick / step key
    pub step_minutes: i64,
    pub bucket_boundaries: BoundaryMode,
    pub show_4h_view: bool,
    pub request_timeout_secs: u64,
    /// Backend of the solar/wind regional product
    pub regional_api_url: String,
    /// Region queried by `nowcast regional`
    pub regional_region: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: None,
            refresh_interval_secs: 300,
            play_interval_ms: 1000,
            step_minutes: 30,
            bucket_boundaries: BoundaryMode::Legacy,
            show_4h_view: false,
            request_timeout_secs: 30,
            regional_api_url: DEFAULT_REGIONAL_API_URL.to_string(),
            regional_region: "ruvnl".to_string(),
        }
    }
}

impl DashboardConfig {
    /// `<config_dir>/nowcast/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nowcast").join("config.toml"))
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CoreError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = toml::from_str(&content).map_err(|e| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate().map_err(|message| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(config)
    }

    /// Load from the default location, falling back to defaults when there
    /// is no config directory
    pub fn load_default() -> Result<Self, CoreError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=MAX_STEP_MINUTES).contains(&self.step_minutes) {
            return Err(format!(
                "step_minutes must be between 1 and {}, got {}",
                MAX_STEP_MINUTES, self.step_minutes
            ));
        }
        if self.play_interval_ms == 0 {
            return Err("play_interval_ms must be positive".to_string());
        }
        Ok(())
    }

    /// Apply `NOWCAST_BEARER_TOKEN` if set
    pub fn with_env_overrides(self) -> Self {
        self.with_token_override(std::env::var(TOKEN_ENV).ok())
    }

    /// Replace the token when `token` is non-empty
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api_token = Some(token);
        }
        self
    }

    /// Persist to `path`, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn step(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.step_minutes.clamp(1, MAX_STEP_MINUTES))
    }

    /// Granularity "now" is floored to, independent of the step
    pub fn anchor_step(&self) -> chrono::Duration {
        chrono::Duration::minutes(ANCHOR_STEP_MINUTES)
    }

    pub fn playback_config(&self, driver: TickDriver) -> PlaybackConfig {
        PlaybackConfig {
            step: self.step(),
            tick_interval: Duration::from_millis(self.play_interval_ms.max(1)),
            anchor_step: self.anchor_step(),
            driver,
        }
    }
}
