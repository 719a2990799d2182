pub mod states;

use crate::core::config::SocketConfig;
use crate::core::socket::{Socket, SocketParts};
use crate::protocol::JsonCodec;
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`Socket`]
///
/// The type system enforces that a transport is supplied before the
/// socket can be built. Everything else has a default: the JSON codec,
/// a fixed reconnection delay taken from the config, and the default
/// timings of [`SocketConfig`].
pub struct SocketBuilder<T>
where
    T: TransportState,
{
    _state: TypeState<T>,
    transport: Option<Arc<dyn Transport>>,
    codec: Option<Arc<dyn MessageCodec>>,
    reconnect_strategy: Option<Arc<dyn ReconnectionStrategy>>,
    config: SocketConfig,
}

impl SocketBuilder<NoTransport> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            transport: None,
            codec: None,
            reconnect_strategy: None,
            config: SocketConfig::default(),
        }
    }

    pub fn transport(self, transport: impl Transport) -> SocketBuilder<HasTransport> {
        SocketBuilder {
            _state: TypeState::new(),
            transport: Some(Arc::new(transport)),
            codec: self.codec,
            reconnect_strategy: self.reconnect_strategy,
            config: self.config,
        }
    }
}

impl Default for SocketBuilder<NoTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SocketBuilder<T>
where
    T: TransportState,
{
    /// Set the wire codec (default: [`JsonCodec`])
    pub fn codec(mut self, codec: impl MessageCodec) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Set the credential sent in `register`
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_token = token.into();
        self
    }

    /// Replace all timings and the credential at once
    pub fn config(mut self, config: SocketConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the reconnection strategy
    ///
    /// Defaults to a [`FixedDelay`] of `reconnect_delay_ms`.
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Arc::new(strategy));
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval_ms = duration_ms(interval);
        self
    }
}

impl SocketBuilder<HasTransport> {
    /// Build the socket
    ///
    /// Must be called from within a tokio runtime; the socket spawns its
    /// internal tasks right away but does not connect yet.
    pub fn build(self) -> Result<Socket> {
        self.config.validate()?;

        let transport = self.transport.ok_or_else(|| {
            SocketError::Configuration("transport is required".to_string())
        })?;
        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(JsonCodec::new()));
        let strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Arc::new(FixedDelay::new(self.config.reconnect_delay())));

        Ok(Socket::new(SocketParts {
            transport,
            codec,
            strategy,
            config: self.config,
        }))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
