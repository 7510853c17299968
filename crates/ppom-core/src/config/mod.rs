//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: the `set_default` calls in [`AppConfig::from_file`]
//!    mirror the `Default` implementations
//! 2. **Config file**: TOML file named by the `PPOM_CONFIG` env var
//! 3. **Environment variables**: `PPOM__SECTION__FIELD` overrides one field
//!
//! # Configuration Sections
//!
//! - [`CdnConfig`]: where data files come from and the key that signs them
//! - [`SyncConfig`]: manifest poll period and background download pacing
//! - [`ChainsConfig`]: bounds and retention of the chain activity cache
//! - [`SessionConfig`]: feature gate, relay cap and JSON-RPC provider
//! - [`StorageConfig`]: where verified files are kept
//! - [`LoggingConfig`]: log level and format
//!
//! # Example
//!
//! ```toml
//! [cdn]
//! base_url = "https://cdn.example.com/ppom"
//! public_key = "<64 hex chars>"
//!
//! [sync]
//! data_update_interval_seconds = 3600
//!
//! [session]
//! security_alerts_enabled = true
//! rpc_url = "https://eth-mainnet.example.com"
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

use crate::{
    chain::ChainActivityPolicy, integrity, scheduler::SchedulerConfig,
    session::DEFAULT_PROVIDER_REQUEST_LIMIT,
};

/// Content delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnConfig {
    /// Base URL the manifest and data file paths are resolved against.
    pub base_url: String,

    /// Hex-encoded Ed25519 key that signs every data file.
    pub public_key: String,

    /// Timeout for every CDN request. Defaults to `10`.
    pub fetch_timeout_seconds: u64,
}

/// Manifest polling and background download pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Period of the background manifest sync. Defaults to `3600`.
    pub data_update_interval_seconds: u64,

    /// Time budget for draining a download backlog. Defaults to `3600`.
    pub file_fetch_window_seconds: u64,

    /// Longest delay between two background downloads. Defaults to `300`.
    pub file_fetch_tick_seconds: u64,
}

/// Chain activity cache bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainsConfig {
    /// Defaults to `5`.
    pub max_tracked: usize,

    /// Defaults to `2`.
    pub min_tracked: usize,

    /// Chains idle for longer are pruned. Defaults to 7 days.
    pub retention_seconds: u64,
}

/// Engine session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Master switch for the whole feature. Defaults to `false`.
    pub security_alerts_enabled: bool,

    /// Relayed provider calls allowed per session. Defaults to `300`.
    pub provider_request_limit: usize,

    /// JSON-RPC endpoint engine queries are relayed to.
    #[serde(default)]
    pub rpc_url: Option<String>,
}

/// Verified file storage location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for data files. Files are kept in memory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cdn: CdnConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub chains: ChainsConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

const DEFAULT_CDN_BASE_URL: &str = "https://static.cx.metamask.io/api/v1/confirmations/ppom";
const DEFAULT_RETENTION_SECONDS: u64 = 7 * 24 * 60 * 60;

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CDN_BASE_URL.to_string(),
            public_key: String::new(),
            fetch_timeout_seconds: 10,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_update_interval_seconds: 3600,
            file_fetch_window_seconds: 3600,
            file_fetch_tick_seconds: 300,
        }
    }
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self { max_tracked: 5, min_tracked: 2, retention_seconds: DEFAULT_RETENTION_SECONDS }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            security_alerts_enabled: false,
            provider_request_limit: DEFAULT_PROVIDER_REQUEST_LIMIT,
            rpc_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cdn: CdnConfig::default(),
            sync: SyncConfig::default(),
            chains: ChainsConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Use `__` as a separator for nested fields (e.g., `PPOM__CDN__PUBLIC_KEY=...`).
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("cdn.base_url", DEFAULT_CDN_BASE_URL)?
            .set_default("cdn.public_key", "")?
            .set_default("cdn.fetch_timeout_seconds", 10)?
            .set_default("sync.data_update_interval_seconds", 3600)?
            .set_default("sync.file_fetch_window_seconds", 3600)?
            .set_default("sync.file_fetch_tick_seconds", 300)?
            .set_default("chains.max_tracked", 5)?
            .set_default("chains.min_tracked", 2)?
            .set_default("chains.retention_seconds", DEFAULT_RETENTION_SECONDS)?
            .set_default("session.security_alerts_enabled", false)?
            .set_default(
                "session.provider_request_limit",
                u64::try_from(DEFAULT_PROVIDER_REQUEST_LIMIT).unwrap_or(u64::MAX),
            )?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("PPOM").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, or the file named by
    /// `PPOM_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PPOM_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.cdn.base_url.is_empty() {
            return Err("CDN base URL must not be empty".to_string());
        }
        if !self.cdn.base_url.starts_with("http") {
            return Err(format!("Invalid CDN base URL: {}", self.cdn.base_url));
        }

        if integrity::parse_public_key(&self.cdn.public_key).is_err() {
            return Err("CDN public key must be a 64 hex character Ed25519 key".to_string());
        }

        if let Some(rpc_url) = &self.session.rpc_url {
            if !rpc_url.starts_with("http") {
                return Err(format!("Invalid RPC URL: {rpc_url}"));
            }
        }

        if self.cdn.fetch_timeout_seconds == 0 {
            return Err("Fetch timeout must be greater than 0".to_string());
        }
        if self.sync.data_update_interval_seconds == 0 {
            return Err("Data update interval must be greater than 0".to_string());
        }
        if self.sync.file_fetch_window_seconds == 0 {
            return Err("File fetch window must be greater than 0".to_string());
        }
        if self.sync.file_fetch_tick_seconds == 0 {
            return Err("File fetch tick must be greater than 0".to_string());
        }
        if self.chains.retention_seconds == 0 {
            return Err("Chain retention must be greater than 0".to_string());
        }

        if self.chains.max_tracked == 0 {
            return Err("Max tracked chains must be greater than 0".to_string());
        }
        if self.chains.min_tracked > self.chains.max_tracked {
            return Err(format!(
                "Min tracked chains ({}) must not exceed max tracked chains ({})",
                self.chains.min_tracked, self.chains.max_tracked
            ));
        }

        if self.session.provider_request_limit == 0 {
            return Err("Provider request limit must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.cdn.fetch_timeout_seconds)
    }

    #[must_use]
    pub fn data_update_interval(&self) -> Duration {
        Duration::from_secs(self.sync.data_update_interval_seconds)
    }

    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            file_fetch_tick: Duration::from_secs(self.sync.file_fetch_tick_seconds),
            file_fetch_window: Duration::from_secs(self.sync.file_fetch_window_seconds),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the retention does not fit a `chrono::Duration`.
    pub fn chain_policy(&self) -> Result<ChainActivityPolicy, String> {
        let seconds = i64::try_from(self.chains.retention_seconds)
            .map_err(|_| "Chain retention is too large".to_string())?;
        let retention = chrono::Duration::try_seconds(seconds)
            .ok_or_else(|| "Chain retention is too large".to_string())?;
        Ok(ChainActivityPolicy {
            max_tracked: self.chains.max_tracked,
            min_tracked: self.chains.min_tracked,
            retention,
        })
    }
}
