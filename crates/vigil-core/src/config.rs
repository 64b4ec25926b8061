//! Configuration loading for Vigil.
//!
//! Configuration lives in `~/.vigil/config.yaml`. Every section is optional and
//! falls back to defaults, so an absent file is a valid configuration.
//!
//! ```yaml
//! api:
//!   base_url: https://leonardo.example.org
//!   timeout_secs: 30
//! polling:
//!   resource_interval_ms: 10000
//! notifications:
//!   ready_tools: [RStudio]
//! age:
//!   runtime:
//!     max_age_days: 60
//!     legacy_cutoff: 2019-08-01
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, VigilError};
use crate::types::ResourceKind;

/// Default config file path (`~/.vigil/config.yaml`).
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".vigil/config.yaml"))
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VigilConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub age: AgeConfig,
}

impl VigilConfig {
    /// Load configuration from the default path, or defaults if there is none.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate configuration from a specific path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file does not exist: {:?}", path);
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| VigilError::io("reading config", path, e))?;
        let config = Self::parse(&content).map_err(|message| VigilError::ConfigInvalid {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<VigilConfig>(content).map_err(|e| e.to_string())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("polling.resource_interval_ms", self.polling.resource_interval_ms),
            ("polling.deletion_interval_ms", self.polling.deletion_interval_ms),
            ("polling.migration_interval_ms", self.polling.migration_interval_ms),
        ] {
            if value < 100 {
                return Err(VigilError::config_validation(format!(
                    "{field} must be >= 100, got {value}"
                )));
            }
        }

        if self.api.base_url.trim().is_empty() {
            return Err(VigilError::config_validation("api.base_url must not be empty"));
        }
        if self.api.storage_url.trim().is_empty() {
            return Err(VigilError::config_validation(
                "api.storage_url must not be empty",
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(VigilError::config_validation("api.timeout_secs must be > 0"));
        }

        for (kind, policy) in [("runtime", &self.age.runtime), ("app", &self.age.app)] {
            if policy.max_age_days == Some(0) {
                return Err(VigilError::config_validation(format!(
                    "age.{kind}.max_age_days must be > 0"
                )));
            }
        }

        if self.notifications.max_notifications == 0 {
            return Err(VigilError::config_validation(
                "notifications.max_notifications must be > 0",
            ));
        }

        Ok(())
    }
}

/// Backend API settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the resource API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the object storage API (error logs live there)
    #[serde(default = "default_storage_url")]
    pub storage_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            storage_url: default_storage_url(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_storage_url() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_token_env() -> String {
    "VIGIL_TOKEN".to_string()
}

/// Poll intervals.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_resource_interval")]
    pub resource_interval_ms: u64,

    #[serde(default = "default_deletion_interval")]
    pub deletion_interval_ms: u64,

    #[serde(default = "default_migration_interval")]
    pub migration_interval_ms: u64,
}

impl PollingConfig {
    pub fn resource_interval(&self) -> Duration {
        Duration::from_millis(self.resource_interval_ms)
    }

    pub fn deletion_interval(&self) -> Duration {
        Duration::from_millis(self.deletion_interval_ms)
    }

    pub fn migration_interval(&self) -> Duration {
        Duration::from_millis(self.migration_interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            resource_interval_ms: default_resource_interval(),
            deletion_interval_ms: default_deletion_interval(),
            migration_interval_ms: default_migration_interval(),
        }
    }
}

fn default_resource_interval() -> u64 {
    10_000
}

fn default_deletion_interval() -> u64 {
    30_000
}

fn default_migration_interval() -> u64 {
    15_000
}

/// Which transitions alert, and how.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// Alert for resources already in error on the first poll
    #[serde(default)]
    pub notify_existing_errors: bool,

    /// Runtime `tool` labels that get a "ready" notification
    #[serde(default = "default_ready_tools")]
    pub ready_tools: Vec<String>,

    /// App types that get a "ready" notification
    #[serde(default = "default_ready_app_types")]
    pub ready_app_types: Vec<String>,

    /// Launch link for ready notifications; `{namespace}`, `{name}` and `{tool}` are substituted
    #[serde(default)]
    pub launch_url_template: Option<String>,

    /// Upper bound on notifications kept in the display list
    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notify_existing_errors: false,
            ready_tools: default_ready_tools(),
            ready_app_types: default_ready_app_types(),
            launch_url_template: None,
            max_notifications: default_max_notifications(),
        }
    }
}

fn default_ready_tools() -> Vec<String> {
    vec!["RStudio".to_string()]
}

fn default_ready_app_types() -> Vec<String> {
    vec!["GALAXY".to_string()]
}

fn default_max_notifications() -> usize {
    100
}

/// Age thresholds per resource kind.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgeConfig {
    #[serde(default = "default_runtime_age")]
    pub runtime: AgePolicy,

    #[serde(default)]
    pub app: AgePolicy,
}

impl AgeConfig {
    pub fn for_kind(&self, kind: ResourceKind) -> Option<&AgePolicy> {
        match kind {
            ResourceKind::Runtime => Some(&self.runtime),
            ResourceKind::App => Some(&self.app),
            ResourceKind::Workspace => None,
        }
    }
}

impl Default for AgeConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime_age(),
            app: AgePolicy::default(),
        }
    }
}

fn default_runtime_age() -> AgePolicy {
    AgePolicy {
        max_age_days: Some(60),
        legacy_cutoff: NaiveDate::from_ymd_opt(2019, 8, 1),
    }
}

/// "Outdated" thresholds for one resource kind. Both are optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AgePolicy {
    /// Resources older than this many days get an outdated warning
    #[serde(default)]
    pub max_age_days: Option<u32>,

    /// Resources created before this date are incompatible and get an update warning
    #[serde(default)]
    pub legacy_cutoff: Option<NaiveDate>,
}

impl AgePolicy {
    pub fn is_enabled(&self) -> bool {
        self.max_age_days.is_some() || self.legacy_cutoff.is_some()
    }
}
