//! Configuration system for tracestitch
//!
//! Provides:
//! - Config file discovery (CLI flag, env var, standard paths)
//! - TOML parsing with serde
//! - Environment variable overrides
//!
//! Backend endpoints and tokens are configuration injected into the client
//! constructors, never compiled-in literals, so tests can point them at
//! local doubles.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete tracestitch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Log-search backend settings
    pub log_search: LogSearchSettings,

    /// Tracing backend settings
    pub apm: ApmSettings,

    /// HTTP wrapper settings
    pub web: WebSettings,
}

/// Log-search backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSearchSettings {
    /// Search endpoint URL
    pub endpoint: String,

    /// API token sent in the `token` header
    pub token: String,

    /// Application name tag that marks the edge-layer entry
    pub edge_app_name: String,

    /// Fully qualified name of the dispatch action whose logs carry the
    /// CDN request metadata
    pub dispatch_action: String,
}

impl Default for LogSearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://logs-api.example.com/*/_search".to_string(),
            token: String::new(),
            edge_app_name: "fastly".to_string(),
            dispatch_action: "/platform/services/dispatch".to_string(),
        }
    }
}

/// Tracing backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApmSettings {
    /// API base URL
    pub endpoint: String,

    /// Bearer token
    pub token: String,
}

impl Default for ApmSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://apm-api.example.com".to_string(),
            token: String::new(),
        }
    }
}

/// HTTP wrapper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub host: String,
    pub port: u16,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

/// Configuration loader with file discovery and env overrides
#[derive(Debug, Default)]
pub struct ConfigLoader {
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config path from a CLI argument
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Load configuration with the following precedence:
    /// 1. CLI --config flag
    /// 2. STITCH_CONFIG environment variable
    /// 3. ~/.config/tracestitch/config.toml
    /// 4. Default values
    ///
    /// Environment variable overrides are applied on top in every case.
    pub fn load(&self) -> ConfigResult<StitchConfig> {
        let config_path = self.find_config_file();

        let mut config = if let Some(path) = config_path {
            info!("Loading configuration from: {}", path.display());
            self.load_from_file(&path)?
        } else {
            debug!("No config file found, using defaults");
            StitchConfig::default()
        };

        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!("CLI config path does not exist: {}", path.display());
        }

        if let Ok(env_path) = std::env::var("STITCH_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            warn!("STITCH_CONFIG path does not exist: {}", env_path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("tracestitch").join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn load_from_file(&self, path: &Path) -> ConfigResult<StitchConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: StitchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(&self, config: &mut StitchConfig) {
        if let Ok(val) = std::env::var("STITCH_LOG_SEARCH_ENDPOINT") {
            config.log_search.endpoint = val;
        }
        if let Ok(val) = std::env::var("STITCH_LOG_SEARCH_TOKEN") {
            config.log_search.token = val;
        }
        if let Ok(val) = std::env::var("STITCH_APM_ENDPOINT") {
            config.apm.endpoint = val;
        }
        if let Ok(val) = std::env::var("STITCH_APM_TOKEN") {
            config.apm.token = val;
        }
        if let Ok(val) = std::env::var("STITCH_WEB_HOST") {
            config.web.host = val;
        }
        if let Ok(val) = std::env::var("STITCH_WEB_PORT") {
            if let Ok(port) = val.parse() {
                config.web.port = port;
            }
        }
    }
}
