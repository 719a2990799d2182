//! # resocket
//!
//! A resilient, session-aware WebSocket client.
//!
//! ## Features
//!
//! - **Shared connection**: opened on first subscriber, torn down after the last
//! - **Self-healing**: reconnects after every disconnect through a pluggable strategy
//! - **Registration handshake**: authenticates each new connection before use
//! - **Correlated calls**: request/response over the event stream, matched by id
//! - **Keepalive**: best-effort or guaranteed application pings

pub mod core;
pub mod protocol;
pub mod traits;
pub mod transport;

// Re-export all traits
pub use traits::*;

// Re-export core socket functionality
pub use crate::core::{
    builder, bus, config, connection_state, correlator, events, keepalive, session, socket,
    supervisor,
    builder::{states, SocketBuilder},
    config::SocketConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics},
    correlator::{CorrelationId, CorrelationIds, PendingRequests},
    events::{ApplicationEvent, ConnectedSender},
    keepalive::{KeepaliveHandle, KeepalivePolicy, BEST_EFFORT_PING, GUARANTEED_PING},
    session::Session,
    socket::{RegisteredStream, Socket},
    supervisor::{ConnectionLease, ConnectionStream, ConnectionSupervisor},
};

pub use protocol::{DataMessage, JsonCodec, Message, MessageType};
pub use transport::TungsteniteTransport;

// Convenience function
pub use crate::core::builder as socket_builder;
