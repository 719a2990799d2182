//! Transport collaborator interface
//!
//! A transport turns one connection attempt into a finite stream of
//! [`RawEvent`]s. The stream starts with `Connected` (or goes straight to
//! `Disconnected` when the attempt fails), carries every data frame in the
//! order the peer sent it, and ends after a single `Disconnected`.
//!
//! ```text
//! open() ──> Connected(handle) ─> TextFrame* / BinaryFrame* ─> Disconnected(cause) ─> end
//! ```
//!
//! Dropping the stream must tear the underlying connection down.

use crate::traits::error::{Result, SocketError};
use crate::traits::frame::Frame;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Outbound side of one live transport connection
pub trait ConnectionHandle: Send + Sync + fmt::Debug {
    /// Queue a frame for sending
    ///
    /// Must fail once the connection this handle belongs to has ended.
    fn send(&self, frame: Frame) -> Result<()>;

    /// Ask the transport to close this connection
    fn close(&self);
}

/// Shared, cloneable reference to a connection handle
pub type Handle = Arc<dyn ConnectionHandle>;

/// Stream of events produced by a single connection attempt
pub type RawEventStream = BoxStream<'static, RawEvent>;

/// HTTP response returned when the WebSocket upgrade was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub status: u16,
    pub reason: String,
}

/// Why a connection ended
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// The peer sent a close frame
    #[error("server requested close (code={code}, reason={reason})")]
    RemoteClose { code: u16, reason: String },

    /// The connection could not be established or broke
    #[error("transport failure: {message}")]
    TransportFailure {
        message: String,
        response: Option<HandshakeResponse>,
    },

    /// The connection was disposed on purpose by this side
    #[error("connection disposed locally")]
    LocalDisposal,
}

impl DisconnectCause {
    /// Build a transport failure without an HTTP response
    pub fn failure(message: impl Into<String>) -> Self {
        DisconnectCause::TransportFailure {
            message: message.into(),
            response: None,
        }
    }

    /// Whether the supervisor should reconnect after this cause
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DisconnectCause::LocalDisposal)
    }
}

impl From<DisconnectCause> for SocketError {
    fn from(cause: DisconnectCause) -> Self {
        match cause {
            DisconnectCause::RemoteClose { code, reason } => SocketError::RemoteClose { code, reason },
            DisconnectCause::TransportFailure {
                message,
                response: Some(response),
            } => SocketError::Transport(format!(
                "{} (HTTP {} {})",
                message, response.status, response.reason
            )),
            DisconnectCause::TransportFailure { message, .. } => SocketError::Transport(message),
            DisconnectCause::LocalDisposal => SocketError::Closed,
        }
    }
}

/// Event emitted by a transport connection
#[derive(Debug, Clone)]
pub enum RawEvent {
    Connected(Handle),
    TextFrame(Handle, String),
    BinaryFrame(Handle, Vec<u8>),
    Disconnected(DisconnectCause),
}

/// Something that can open connections to a fixed peer
///
/// Each call to [`Transport::open`] performs exactly one connection attempt.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a new connection and return its event stream
    ///
    /// Failures are reported in-band as `RawEvent::Disconnected`, never as
    /// an error return, so the caller treats them like any other disconnect.
    async fn open(&self) -> RawEventStream;
}
