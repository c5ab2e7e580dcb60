//! Persisted dashboard settings stored as TOML in the app directory.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod io;

pub use io::{config_path, load_or_default, load_settings_from, save, save_to_path};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment variable that overrides `server.api_token`.
pub const API_TOKEN_ENV: &str = "HEALTHWATCH_API_TOKEN";

const MIN_ALERT_REFRESH_SECS: u64 = 30;
const MIN_NOTIFICATION_TTL_SECS: u64 = 1;
const MAX_NOTIFICATION_TTL_SECS: u64 = 120;

/// Errors that may occur while loading or saving app configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write a config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

impl AppConfig {
    pub(crate) fn normalized(mut self) -> Self {
        self.dashboard = self.dashboard.normalized();
        self
    }
}

/// Where the health API lives and how to authenticate against it.
///
/// Config keys: `base_url`, `api_token`, `assistant_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    /// Assistant endpoint forwarded with each chat message.
    #[serde(default)]
    pub assistant_url: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            assistant_url: None,
        }
    }
}

impl ServerSettings {
    /// Token from the environment if set, otherwise from the file.
    pub fn resolved_api_token(&self) -> Option<String> {
        std::env::var(API_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| {
                self.api_token
                    .clone()
                    .filter(|token| !token.trim().is_empty())
            })
    }
}

/// Dashboard refresh and notification timing.
///
/// Config keys: `alert_refresh_secs`, `notification_ttl_secs`, `filter_by_location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSettings {
    #[serde(default = "default_alert_refresh_secs")]
    pub alert_refresh_secs: u64,
    #[serde(default = "default_notification_ttl_secs")]
    pub notification_ttl_secs: u64,
    /// Initial value of the location filter toggle.
    #[serde(default)]
    pub filter_by_location: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            alert_refresh_secs: default_alert_refresh_secs(),
            notification_ttl_secs: default_notification_ttl_secs(),
            filter_by_location: false,
        }
    }
}

impl DashboardSettings {
    pub(crate) fn normalized(mut self) -> Self {
        self.alert_refresh_secs = self.alert_refresh_secs.max(MIN_ALERT_REFRESH_SECS);
        self.notification_ttl_secs = self
            .notification_ttl_secs
            .clamp(MIN_NOTIFICATION_TTL_SECS, MAX_NOTIFICATION_TTL_SECS);
        self
    }

    pub fn alert_refresh(&self) -> Duration {
        Duration::from_secs(self.alert_refresh_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_alert_refresh_secs() -> u64 {
    300
}

fn default_notification_ttl_secs() -> u64 {
    6
}
