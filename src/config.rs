//! Runtime settings for fetching and rendering.
//!
//! Settings come from an optional YAML file (see `--config`); anything the
//! file leaves out falls back to the defaults below. Command-line flags are
//! applied on top by `main`.
//!
//! ```yaml
//! fetch:
//!   timeout_ms: 10000
//!   user_agents:            # optional; random real-world agents when empty
//!     - "Mozilla/5.0 (X11; Linux x86_64) ..."
//! render:
//!   sleep_ms: 2000
//!   timeout_ms: 20000
//!   webdriver_url: "http://localhost:9515"
//!   headless: true
//!   browser_args: ["--lang=pl-PL"]
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub render: RenderSettings,
}

/// HTTP session settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Optional pool of user agents to pick from. When empty, each session
    /// draws a random browser agent from `fake_user_agent`.
    pub user_agents: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agents: Vec::new(),
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Delay after the page reports ready, letting late scripts run.
    pub sleep_ms: u64,
    /// Upper bound for navigation and document readiness.
    pub timeout_ms: u64,
    /// WebDriver endpoint (chromedriver by default).
    pub webdriver_url: String,
    pub headless: bool,
    /// Extra Chrome arguments appended after the session's own.
    pub browser_args: Vec<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sleep_ms: 2_000,
            timeout_ms: 20_000,
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            browser_args: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded settings");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}
