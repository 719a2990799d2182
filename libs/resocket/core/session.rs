//! Registration handshake and the connected-and-registered state cell
//!
//! The tracker is the single writer of the session state:
//!
//! - `Connected(sender)`: send `register` with the configured token
//! - `Message(sender, Registered)`: state becomes `Some(sender)`
//! - `Disconnected(_)`: state becomes `None`
//!
//! There is no handshake timeout; a peer that never answers leaves the
//! state at `None` until the connection drops.

use crate::core::bus::EventStream;
use crate::core::events::{ApplicationEvent, ConnectedSender};
use crate::protocol::Message;
use crate::traits::{Result, SocketError};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Read side of the session state
#[derive(Clone)]
pub struct Session {
    rx: watch::Receiver<Option<ConnectedSender>>,
}

impl Session {
    /// Sender of the registered connection, if there is one right now
    pub fn current(&self) -> Option<ConnectedSender> {
        self.rx.borrow().clone()
    }

    pub fn is_registered(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until a connection is registered
    ///
    /// Fails with [`SocketError::Closed`] once the socket is gone.
    pub async fn wait_connected(&self) -> Result<ConnectedSender> {
        let mut rx = self.rx.clone();
        loop {
            if let Some(sender) = rx.borrow_and_update().clone() {
                return Ok(sender);
            }
            rx.changed().await.map_err(|_| SocketError::Closed)?;
        }
    }

    /// Raw receiver of state changes
    ///
    /// The current value counts as seen, so `changed()` resolves only on
    /// the next transition.
    pub fn watch(&self) -> watch::Receiver<Option<ConnectedSender>> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }

    /// Stream yielding the current state, then every change
    pub fn updates(&self) -> BoxStream<'static, Option<ConnectedSender>> {
        let rx = self.rx.clone();
        futures::stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let value = rx.borrow_and_update().clone();
            Some((value, (rx, false)))
        })
        .boxed()
    }
}

/// Spawn the handshake tracker over an already-taken bus subscription
///
/// The subscription is taken by the caller so no event published after
/// construction can be missed.
pub(crate) fn spawn_tracker(
    events: EventStream<ApplicationEvent>,
    auth_token: String,
) -> (Session, JoinHandle<()>) {
    let (tx, rx) = watch::channel(None);
    let handle = tokio::spawn(track(events, auth_token, tx));
    (Session { rx }, handle)
}

async fn track(
    mut events: EventStream<ApplicationEvent>,
    auth_token: String,
    tx: watch::Sender<Option<ConnectedSender>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ApplicationEvent::Connected(sender) => {
                debug!("Registering on connection #{}", sender.connection_id());
                if let Err(e) = sender.send(&Message::register(auth_token.as_str())) {
                    warn!("Failed to send register message: {}", e);
                }
            }
            ApplicationEvent::Message(sender, Message::Registered) => {
                info!("Connection #{} registered", sender.connection_id());
                tx.send_replace(Some(sender));
            }
            ApplicationEvent::Disconnected(_) => {
                if tx.send_replace(None).is_some() {
                    debug!("Session reset");
                }
            }
            _ => {}
        }
    }
    tx.send_replace(None);
    debug!("Handshake tracker exiting");
}
