//! Configuration types for a tether workspace.

use crate::error::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Comprehensive configuration for a tether workspace.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote graph service configuration.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Sync pipeline configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from `config.toml` under the tether directory.
    pub fn load(tether_root: &Path) -> Result<Self> {
        let path = tether_root.join("config.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| TetherError::ConfigError(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| TetherError::ConfigError(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `config.toml` under the tether directory.
    pub fn save(&self, tether_root: &Path) -> Result<Self> {
        let path = tether_root.join("config.toml");
        let content = toml::to_string_pretty(self)
            .map_err(|e| TetherError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| TetherError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(self.clone())
    }
}

/// Remote graph service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the graph service API.
    pub base_url: String,

    /// Project identifier on the remote (graph scope for all entity ids).
    pub project_id: String,

    /// Environment variable holding the bearer token. The token itself is
    /// never written to config.
    pub token_env: String,

    /// Per-request timeout in seconds (default: 10).
    pub timeout_secs: u64,

    /// Maximum attempts per call, including the first (default: 3).
    pub retry_attempts: u32,

    /// Base delay for exponential backoff in milliseconds (default: 500).
    pub retry_base_delay_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.example.dev/api/v1".to_string(),
            project_id: "default".to_string(),
            token_env: "TETHER_TOKEN".to_string(),
            timeout_secs: 10,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl RemoteConfig {
    /// Returns the per-request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the backoff base delay as a Duration.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Sync pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Number of concurrent upsert workers in a push batch (default: 4).
    /// Work is sharded by entity id so a single entity never runs on two
    /// workers at once.
    pub workers: usize,

    /// Page size for pulling events into the local cache (default: 200).
    pub event_page_size: usize,

    /// Timeout in seconds for the inline auto-push attempt (default: 3).
    /// Shorter than the normal remote timeout so status-mutation commands
    /// stay snappy when the network is slow.
    pub autopush_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            event_page_size: 200,
            autopush_timeout_secs: 3,
        }
    }
}

impl SyncConfig {
    /// Returns the auto-push timeout as a Duration.
    pub fn autopush_timeout(&self) -> Duration {
        Duration::from_secs(self.autopush_timeout_secs)
    }
}

/// Explicit sync context passed through component constructors.
///
/// Carries the project scope and credentials so no component reads global
/// mutable state for either.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Project identifier on the remote.
    pub project_id: String,
    /// Bearer token for the remote, resolved from the configured env var.
    /// `None` means unauthenticated (the remote will reject writes).
    pub token: Option<String>,
}

impl SyncContext {
    /// Builds a sync context from config, resolving the token env var.
    pub fn from_config(config: &Config) -> Self {
        Self {
            project_id: config.remote.project_id.clone(),
            token: std::env::var(&config.remote.token_env).ok(),
        }
    }
}
