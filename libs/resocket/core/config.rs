use crate::traits::{Result, SocketError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for a [`Socket`](crate::core::socket::Socket)
///
/// Deserializable so it can be embedded in an application's config file.
/// Every duration has a default, only the credential has to be provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Static credential sent in the `register` message after every connect
    #[serde(default)]
    pub auth_token: String,

    /// Delay between a disconnect and the next connection attempt
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// How long `call()` waits for its matching response
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Interval between keepalive pings
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_keepalive_interval_ms() -> u64 {
    5_000
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl SocketConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.trim().is_empty() {
            return Err(SocketError::Configuration(
                "auth_token must not be empty".to_string(),
            ));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(SocketError::Configuration(
                "reconnect_delay_ms must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(SocketError::Configuration(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.keepalive_interval_ms == 0 {
            return Err(SocketError::Configuration(
                "keepalive_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
