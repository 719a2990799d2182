//! # resocket traits
//!
//! Seams between the session core and the outside world:
//!
//! - **Transport**: opens one connection at a time and reports [`RawEvent`]s
//! - **MessageCodec**: turns [`Message`](crate::protocol::Message)s into frames and back
//! - **ReconnectionStrategy**: decides how long to wait before reconnecting
//!
//! ## Example
//!
//! ```rust,ignore
//! use resocket::*;
//!
//! struct LoopbackTransport;
//!
//! #[async_trait]
//! impl Transport for LoopbackTransport {
//!     async fn open(&self) -> RawEventStream {
//!         // Connect and stream RawEvents until the connection ends
//!     }
//! }
//! ```

pub mod codec;
pub mod error;
pub mod frame;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use codec::{DecodeError, MessageCodec};
pub use error::{Result, SocketError};
pub use frame::Frame;
pub use reconnect::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
pub use transport::{
    ConnectionHandle, DisconnectCause, Handle, HandshakeResponse, RawEvent, RawEventStream,
    Transport,
};
