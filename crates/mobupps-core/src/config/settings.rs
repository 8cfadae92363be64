use crate::search::TopK;
use crate::{Error, Result};
use mobupps_client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use mobupps_types::RefreshInterval;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::Directories;

/// Environment variable that overrides `apiBaseUrl`
pub const API_BASE_URL_ENV: &str = "MOBUPPS_API_BASE_URL";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Neighbors requested when the search form does not say
    #[serde(default = "default_top_k")]
    pub default_top_k: u32,

    #[serde(default)]
    pub refresh_interval: RefreshInterval,

    #[serde(default = "default_health_poll")]
    pub health_poll_secs: u64,

    /// Where metrics exports go; the data dir's `exports/` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_request_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_top_k() -> u32 {
    TopK::DEFAULT.get()
}
fn default_health_poll() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            default_top_k: default_top_k(),
            refresh_interval: RefreshInterval::default(),
            health_poll_secs: default_health_poll(),
            export_dir: None,
        }
    }
}

impl Config {
    /// Load config from file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid JSON or
    /// holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            debug!("{API_BASE_URL_ENV} overrides apiBaseUrl: {url}");
            self.api_base_url = url.trim().to_string();
        }
    }

    /// Check values serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a config error naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "apiBaseUrl must start with http:// or https://, got {url:?}"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "requestTimeoutSecs must be greater than 0".to_string(),
            ));
        }
        if self.health_poll_secs == 0 {
            return Err(Error::Config(
                "healthPollSecs must be greater than 0".to_string(),
            ));
        }
        TopK::new(self.default_top_k)
            .map_err(|e| Error::Config(format!("defaultTopK: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn health_poll(&self) -> Duration {
        Duration::from_secs(self.health_poll_secs)
    }

    /// Default neighbor count, falling back to 20 when unvalidated values are
    /// out of range.
    #[must_use]
    pub fn top_k(&self) -> TopK {
        TopK::new(self.default_top_k).unwrap_or_default()
    }

    #[must_use]
    pub fn export_dir(&self, dirs: &Directories) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| dirs.exports.clone())
    }
}
