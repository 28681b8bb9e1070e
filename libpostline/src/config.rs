//! Configuration management for Postline

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Registered-application settings for the downstream social network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Base URL for the REST API (profile, share, statistics endpoints)
    pub api_base: String,
    pub scope: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

/// One external content-generation provider. Providers are tried in the
/// order they appear in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub text_url: String,
    pub image_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum posts processed per sweep
    pub batch_size: usize,
    /// Seconds between daemon polls
    pub poll_interval: u64,
    /// Seconds after which an unfinished claim lapses
    pub claim_lease_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            poll_interval: 60,
            claim_lease_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window duration in seconds shared by all resources
    pub window_secs: i64,
    /// Per-resource request maximums, e.g. "generate.text" = 20
    #[serde(default)]
    pub limits: HashMap<String, u32>,
    /// Maximum for resources without an explicit entry
    pub default_max: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            limits: HashMap::new(),
            default_max: 30,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        let db_path = resolve_data_path()
            .map(|dir| dir.join("postline.db").to_string_lossy().into_owned())
            .unwrap_or_else(|_| "~/.local/share/postline/postline.db".to_string());

        Self {
            database: DatabaseConfig { path: db_path },
            network: NetworkConfig {
                client_id: String::new(),
                client_secret: String::new(),
                redirect_uri: "http://localhost:8787/callback".to_string(),
                authorize_url: "https://www.linkedin.com/oauth/v2/authorization".to_string(),
                token_url: "https://www.linkedin.com/oauth/v2/accessToken".to_string(),
                api_base: "https://api.linkedin.com/v2".to_string(),
                scope: "r_liteprofile w_member_social".to_string(),
                request_timeout_secs: default_request_timeout(),
            },
            generation: GenerationConfig::default(),
            scheduler: SchedulerConfig::default(),
            rate_limits: RateLimitConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("POSTLINE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("postline").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("postline"))
}
