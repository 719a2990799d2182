//! Typed application events and the capability used to answer them

use crate::core::connection_state::AtomicMetrics;
use crate::protocol::Message;
use crate::traits::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Send capability bound to one live connection
///
/// Handed out with every event of that connection. Once the connection
/// ends, every send fails with [`SocketError::StaleSender`].
#[derive(Clone)]
pub struct ConnectedSender {
    connection_id: u64,
    handle: Handle,
    alive: Arc<AtomicBool>,
    codec: Arc<dyn MessageCodec>,
    metrics: Arc<AtomicMetrics>,
}

impl ConnectedSender {
    pub(crate) fn new(
        connection_id: u64,
        handle: Handle,
        alive: Arc<AtomicBool>,
        codec: Arc<dyn MessageCodec>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        Self {
            connection_id,
            handle,
            alive,
            codec,
            metrics,
        }
    }

    /// Sequence number of the connection this sender belongs to
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Encode and send a message on this connection
    pub fn send(&self, message: &Message) -> Result<()> {
        self.ensure_alive()?;
        let frame = self.codec.encode(message)?;
        debug!(
            "Sending {} message on connection #{}",
            message.message_type(),
            self.connection_id
        );
        self.transmit(frame)
    }

    /// Send a pre-encoded frame on this connection
    pub fn send_frame(&self, frame: Frame) -> Result<()> {
        self.ensure_alive()?;
        self.transmit(frame)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(SocketError::StaleSender {
                connection_id: self.connection_id,
            })
        }
    }

    fn transmit(&self, frame: Frame) -> Result<()> {
        self.handle.send(frame)?;
        self.metrics.increment_sent();
        Ok(())
    }
}

impl PartialEq for ConnectedSender {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id == other.connection_id && Arc::ptr_eq(&self.alive, &other.alive)
    }
}

impl Eq for ConnectedSender {}

impl fmt::Debug for ConnectedSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedSender")
            .field("connection_id", &self.connection_id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Event delivered to every subscriber of a socket
#[derive(Debug, Clone)]
pub enum ApplicationEvent {
    /// Transport connection established, not yet registered
    Connected(ConnectedSender),
    /// A frame decoded into a known message
    Message(ConnectedSender, Message),
    /// A frame that did not decode; the connection stays up
    WrongMessageFormat(ConnectedSender, Frame, DecodeError),
    /// The connection ended
    Disconnected(DisconnectCause),
}

impl ApplicationEvent {
    pub fn sender(&self) -> Option<&ConnectedSender> {
        match self {
            ApplicationEvent::Connected(sender)
            | ApplicationEvent::Message(sender, _)
            | ApplicationEvent::WrongMessageFormat(sender, _, _) => Some(sender),
            ApplicationEvent::Disconnected(_) => None,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            ApplicationEvent::Message(_, message) => Some(message),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ApplicationEvent::Connected(_))
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, ApplicationEvent::Disconnected(_))
    }
}

/// Decode a received frame into an event
///
/// Decode failures become [`ApplicationEvent::WrongMessageFormat`] rather
/// than errors, so one bad frame never ends the stream.
pub(crate) fn classify(
    sender: ConnectedSender,
    frame: Frame,
    codec: &dyn MessageCodec,
) -> ApplicationEvent {
    match codec.decode(&frame) {
        Ok(message) => ApplicationEvent::Message(sender, message),
        Err(error) => ApplicationEvent::WrongMessageFormat(sender, frame, error),
    }
}
