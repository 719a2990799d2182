//! # resocket core
//!
//! Session layer on top of a pluggable transport:
//!
//! - **Supervisor**: reference-counted connection with automatic reconnects
//! - **Session**: registration handshake and the connected-and-registered cell
//! - **Correlator**: request/response calls matched by id
//! - **Keepalive**: periodic pings with best-effort or guaranteed delivery
//!
//! ## Example
//!
//! ```rust,ignore
//! use resocket::*;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let socket = Socket::builder()
//!         .transport(TungsteniteTransport::new("ws://localhost:8080/ws"))
//!         .auth_token("asdf")
//!         .build()?;
//!
//!     let mut events = socket.connection();
//!     let _keepalive = socket.keepalive(KeepalivePolicy::BestEffort);
//!
//!     let response = socket.call(|id| Message::data(id.to_string(), "hello")).await?;
//!     println!("Response: {:?}", response);
//!
//!     while let Some(event) = events.next().await {
//!         println!("Event: {:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod bus;
pub mod config;
pub mod connection_state;
pub mod correlator;
pub mod events;
pub mod keepalive;
pub mod session;
pub mod socket;
pub mod supervisor;

// Re-export main types
pub use builder::{states, SocketBuilder};
pub use bus::{EventBus, EventStream};
pub use config::SocketConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
pub use correlator::{CorrelationId, CorrelationIds, PendingRequests};
pub use events::{ApplicationEvent, ConnectedSender};
pub use keepalive::{KeepaliveHandle, KeepalivePolicy, BEST_EFFORT_PING, GUARANTEED_PING};
pub use session::Session;
pub use socket::{RegisteredStream, Socket};
pub use supervisor::{ConnectionLease, ConnectionStream, ConnectionSupervisor};

/// Create a new socket builder
pub fn builder() -> SocketBuilder<states::NoTransport> {
    SocketBuilder::new()
}
