//! Chat client configuration
//!
//! Loaded from YAML, with the credential and URL overridable from the
//! environment so secrets can live in `.env`.

use resocket::{KeepalivePolicy, SocketConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const AUTH_TOKEN_ENV: &str = "SOCKET_AUTH_TOKEN";
pub const URL_ENV: &str = "SOCKET_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which keepalive loop the client runs, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepaliveMode {
    #[default]
    Off,
    BestEffort,
    Guaranteed,
}

impl KeepaliveMode {
    pub fn policy(&self) -> Option<KeepalivePolicy> {
        match self {
            KeepaliveMode::Off => None,
            KeepaliveMode::BestEffort => Some(KeepalivePolicy::BestEffort),
            KeepaliveMode::Guaranteed => Some(KeepalivePolicy::Guaranteed),
        }
    }
}

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// WebSocket endpoint (ws:// or wss://)
    #[serde(default)]
    pub url: String,
    /// Credential and timings for the socket
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub keepalive: KeepaliveMode,
    /// Extra handshake headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Sender name attached to outgoing chat lines
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Seconds between demo `data` calls
    #[serde(default = "default_request_interval")]
    pub request_interval_secs: u64,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_request_interval() -> u64 {
    10
}

fn default_display_name() -> String {
    "resocket".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ChatConfig {
    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: ChatConfig = serde_yaml::from_str(&yaml_content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate without touching the environment
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ChatConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style lookups
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(AUTH_TOKEN_ENV) {
            info!("Overriding auth token from environment variable");
            self.socket.auth_token = token;
        }
        if let Some(url) = lookup(URL_ENV) {
            info!("Overriding socket url from environment variable");
            self.url = url;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        self.socket
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.display_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "display_name must not be empty".to_string(),
            ));
        }

        if self.request_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_interval_secs must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  URL: {}", self.url);
        info!("  Reconnect delay: {} ms", self.socket.reconnect_delay_ms);
        info!("  Request timeout: {} ms", self.socket.request_timeout_ms);
        info!("  Keepalive: {:?} every {} ms", self.keepalive, self.socket.keepalive_interval_ms);
        info!("  Display name: {}", self.display_name);
        info!("  Request interval: {} seconds", self.request_interval_secs);
        info!("  Extra headers: {}", self.headers.len());
        info!("  Log level: {}", self.log_level);
    }
}
