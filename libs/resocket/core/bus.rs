//! Replay-free fan-out of events to a dynamic set of listeners
//!
//! ```text
//!                      ┌──> listener channel ──> Handshake tracker
//! Supervisor ─publish──┼──> listener channel ──> Correlator dispatcher
//!                      ├──> listener channel ──> Keepalive / external
//!                      └──> ...
//! ```
//!
//! Every listener owns an unbounded channel, so a slow consumer never makes
//! the publisher wait and never loses events. Closed listeners are pruned
//! on the next publish. A listener only sees events published after it
//! subscribed.

use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

struct BusInner<T> {
    listeners: Vec<UnboundedSender<T>>,
    closed: bool,
}

/// Multi-listener event bus
pub struct EventBus<T> {
    inner: Arc<Mutex<BusInner<T>>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                listeners: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Register a new listener
    ///
    /// After [`EventBus::close`] the returned stream ends immediately.
    pub fn subscribe(&self) -> EventStream<T> {
        let (tx, rx) = unbounded_channel();
        let mut inner = self.inner.lock();
        if !inner.closed {
            inner.listeners.push(tx);
        }
        EventStream { rx }
    }

    /// Deliver an event to every live listener
    ///
    /// Returns the number of listeners that received it.
    pub fn publish(&self, event: T) -> usize {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|tx| tx.send(event.clone()).is_ok());
        inner.listeners.len()
    }

    /// Number of listeners still registered
    pub fn listener_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|tx| !tx.is_closed());
        inner.listeners.len()
    }

    /// Drop every listener; their streams end once drained
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.listeners.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

/// Receiving end of one bus subscription
pub struct EventStream<T> {
    rx: UnboundedReceiver<T>,
}

impl<T> EventStream<T> {
    /// Wait for the next event, `None` once the bus is closed
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for EventStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
