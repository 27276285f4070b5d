//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/chaintree/chaintree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `CHAINTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, ReconcileMode};
use crate::domain::TREE_CONTAINER_ID;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub reconcile: Option<ReconcileMode>,
    pub container_id: Option<String>,
}

/// Unified configuration for chaintree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the chain backend REST API
    pub api_base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// How the tree is reconciled after a mutation
    pub reconcile: ReconcileMode,
    /// Drop zone id that stands for the tree container
    pub container_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            reconcile: ReconcileMode::default(),
            container_id: TREE_CONTAINER_ID.to_string(),
        }
    }
}

/// Get the XDG config directory for chaintree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "chaintree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("chaintree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in the base URL.
    fn expand_paths(&mut self) {
        if let Ok(expanded) = shellexpand::full(&self.api_base_url) {
            self.api_base_url = expanded.into_owned();
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            api_base_url: overlay
                .api_base_url
                .clone()
                .unwrap_or_else(|| self.api_base_url.clone()),
            request_timeout_secs: overlay
                .request_timeout_secs
                .unwrap_or(self.request_timeout_secs),
            reconcile: overlay.reconcile.unwrap_or(self.reconcile),
            container_id: overlay
                .container_id
                .clone()
                .unwrap_or_else(|| self.container_id.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; must exist when given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Apply CHAINTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("CHAINTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("api_base_url") {
            settings.api_base_url = val;
        }
        if let Ok(val) = config.get_string("request_timeout_secs") {
            settings.request_timeout_secs = val.trim().parse().map_err(|e| ApplicationError::Config {
                message: format!("CHAINTREE_REQUEST_TIMEOUT_SECS: {e}"),
            })?;
        }
        if let Ok(val) = config.get_string("reconcile") {
            settings.reconcile = val.parse()?;
        }
        if let Ok(val) = config.get_string("container_id") {
            settings.container_id = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "api_base_url must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ApplicationError::Config {
                message: "request_timeout_secs must be positive".to_string(),
            });
        }
        if self.container_id.is_empty() {
            return Err(ApplicationError::Config {
                message: "container_id must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# chaintree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/chaintree/chaintree.toml
#   File:   --config <FILE>
#   Env:    CHAINTREE_* environment variables (explicit overrides)

# Base URL of the chain backend API (~ and $VAR are expanded)
# api_base_url = "http://localhost:8000/api"

# Request timeout in seconds
# request_timeout_secs = 30

# Reconciliation after a mutation: "reload" re-fetches the chain,
# "patch" applies the validated local change
# reconcile = "reload"

# Drop zone id that stands for the tree container
# container_id = "chain-tree-container"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
