//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `BAZAAR_*` environment variable overrides.

use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ClientConfig;
use crate::booking::default_slot_times;
use crate::cart::{FeePolicy, DEFAULT_DELIVERY_FEE, DEFAULT_FREE_DELIVERY_THRESHOLD};
use crate::geo::GeocodingConfig;
use crate::storage::{DEFAULT_RECENT_MAX, DEFAULT_RECENT_MAX_AGE_DAYS, DEFAULT_VIEWED_FLAG_HOURS};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub checkout: CheckoutConfig,

    #[serde(default)]
    pub booking: BookingConfig,

    #[serde(default)]
    pub geocoding: GeocodingSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:5000/ws".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Local persistence
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,

    #[serde(default = "default_recent_max")]
    pub recently_viewed_max: usize,

    #[serde(default = "default_recent_days")]
    pub recently_viewed_days: i64,

    #[serde(default = "default_viewed_flag_hours")]
    pub viewed_flag_hours: i64,
}

fn default_storage_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("bazaar").join("bazaar.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./bazaar.db".to_string())
}

fn default_session_ttl() -> i64 {
    crate::auth::DEFAULT_SESSION_TTL_HOURS
}

fn default_recent_max() -> usize {
    DEFAULT_RECENT_MAX
}

fn default_recent_days() -> i64 {
    DEFAULT_RECENT_MAX_AGE_DAYS
}

fn default_viewed_flag_hours() -> i64 {
    DEFAULT_VIEWED_FLAG_HOURS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            session_ttl_hours: default_session_ttl(),
            recently_viewed_max: default_recent_max(),
            recently_viewed_days: default_recent_days(),
            viewed_flag_hours: default_viewed_flag_hours(),
        }
    }
}

impl StorageConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    pub fn recently_viewed_age(&self) -> Duration {
        Duration::days(self.recently_viewed_days)
    }

    pub fn viewed_flag_ttl(&self) -> Duration {
        Duration::hours(self.viewed_flag_hours)
    }
}

/// Delivery fee rule
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee: f64,

    #[serde(default = "default_free_delivery_threshold")]
    pub free_delivery_threshold: f64,
}

fn default_delivery_fee() -> f64 {
    DEFAULT_DELIVERY_FEE
}

fn default_free_delivery_threshold() -> f64 {
    DEFAULT_FREE_DELIVERY_THRESHOLD
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            delivery_fee: default_delivery_fee(),
            free_delivery_threshold: default_free_delivery_threshold(),
        }
    }
}

impl CheckoutConfig {
    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy {
            delivery_fee: self.delivery_fee,
            free_delivery_threshold: self.free_delivery_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    #[serde(default = "default_slot_times")]
    pub slot_times: Vec<String>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            slot_times: default_slot_times(),
        }
    }
}

/// Reverse geocoding service
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingSection {
    #[serde(default = "default_geocoding_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_geocoding_url() -> String {
    GeocodingConfig::default().base_url
}

fn default_user_agent() -> String {
    GeocodingConfig::default().user_agent
}

impl Default for GeocodingSection {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("bazaar").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `BAZAAR_*` overrides from `lookup`
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(url) = lookup("BAZAAR_API_URL") {
            self.api.base_url = url;
        }
        if let Some(url) = lookup("BAZAAR_WS_URL") {
            self.api.ws_url = url;
        }
        if let Some(secs) = lookup("BAZAAR_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.api.request_timeout_secs = secs;
        }

        // Storage overrides
        if let Some(path) = lookup("BAZAAR_STORAGE_PATH") {
            self.storage.path = path;
        }

        // Checkout overrides
        if let Some(fee) = lookup("BAZAAR_DELIVERY_FEE").and_then(|v| v.parse().ok()) {
            self.checkout.delivery_fee = fee;
        }
        if let Some(threshold) = lookup("BAZAAR_FREE_DELIVERY_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.checkout.free_delivery_threshold = threshold;
        }

        // Logging overrides
        if let Some(level) = lookup("BAZAAR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("BAZAAR_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            request_timeout_ms: self.api.request_timeout_secs * 1000,
        }
    }

    pub fn geocoding_config(&self) -> GeocodingConfig {
        GeocodingConfig {
            base_url: self.geocoding.base_url.clone(),
            user_agent: self.geocoding.user_agent.clone(),
        }
    }

    /// Storage path with a leading `~` expanded
    pub fn storage_path(&self) -> PathBuf {
        match self.storage.path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.storage.path)),
            None => PathBuf::from(&self.storage.path),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Bazaar Configuration
#
# Environment variables override these settings:
# - BAZAAR_API_URL
# - BAZAAR_WS_URL
# - BAZAAR_REQUEST_TIMEOUT_SECS
# - BAZAAR_STORAGE_PATH
# - BAZAAR_DELIVERY_FEE
# - BAZAAR_FREE_DELIVERY_THRESHOLD
# - BAZAAR_LOG_LEVEL
# - BAZAAR_LOG_FORMAT

[api]
# Marketplace REST API
base_url = "http://localhost:5000/api"

# Live chat socket
ws_url = "ws://localhost:5000/ws"

# Request timeout in seconds
request_timeout_secs = 15

[storage]
# SQLite file holding the session and browsing history
path = "~/.local/share/bazaar/bazaar.db"

# Session lifetime (hours)
session_ttl_hours = 168

# Recently viewed products: how many, and for how long (days)
recently_viewed_max = 12
recently_viewed_days = 30

# A product view is counted once per this many hours
viewed_flag_hours = 24

[checkout]
# Fee charged below the free-delivery threshold
delivery_fee = 300.0
free_delivery_threshold = 5000.0

[booking]
# Bookable slot start times
slot_times = ["09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00"]

[geocoding]
# Nominatim-compatible reverse geocoding
base_url = "https://nominatim.openstreetmap.org"
user_agent = "bazaar/0.1"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
