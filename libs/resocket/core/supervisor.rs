//! Reference-counted, self-healing transport connection
//!
//! ```text
//!  lease #1 ──┐                      ┌──────────── supervise task ─────────────┐
//!  lease #2 ──┼─ 0→1 spawns ───────> │ open() ─> drive events ─> Disconnected  │
//!  lease #n ──┘  1→0 signals stop    │   ^                          │          │
//!                                    │   └──── backoff delay <──────┘          │
//!                                    └──────────────┬─────────────────────────┘
//!                                                   │ publish
//!                                                   v
//!                                     EventBus<ApplicationEvent>
//! ```
//!
//! At most one supervise task runs at a time. A task started after a
//! teardown first waits for its predecessor to finish, so there is never
//! more than one transport connection per socket.

use crate::core::bus::{EventBus, EventStream};
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::core::events::{classify, ApplicationEvent, ConnectedSender};
use crate::traits::*;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct RunningTask {
    handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RunningTask {
    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

struct Lifecycle {
    consumers: usize,
    task: Option<RunningTask>,
    closed: bool,
}

struct Shared {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn MessageCodec>,
    strategy: Arc<dyn ReconnectionStrategy>,
    bus: EventBus<ApplicationEvent>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    connection_ids: AtomicU64,
    lifecycle: Mutex<Lifecycle>,
}

/// Owner of the shared transport connection
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
}

impl ConnectionSupervisor {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        codec: Arc<dyn MessageCodec>,
        strategy: Arc<dyn ReconnectionStrategy>,
        bus: EventBus<ApplicationEvent>,
        state: Arc<AtomicConnectionState>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                codec,
                strategy,
                bus,
                state,
                metrics,
                connection_ids: AtomicU64::new(0),
                lifecycle: Mutex::new(Lifecycle {
                    consumers: 0,
                    task: None,
                    closed: false,
                }),
            }),
        }
    }

    /// Subscribe to the shared connection
    ///
    /// The connection stays open while at least one stream or lease is
    /// alive. Must be called from within a tokio runtime.
    pub fn connection(&self) -> ConnectionStream {
        // Subscribe before acquiring so the first Connected is not missed
        let events = self.shared.bus.subscribe();
        let lease = self.lease();
        ConnectionStream {
            events,
            _lease: lease,
        }
    }

    /// Hold the connection open without receiving its events
    pub fn lease(&self) -> ConnectionLease {
        Shared::acquire(&self.shared);
        ConnectionLease {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of streams and leases currently holding the connection
    pub fn consumer_count(&self) -> usize {
        self.shared.lifecycle.lock().consumers
    }

    /// Stop supervising for good
    ///
    /// Returns the running task so the caller can wait for the teardown.
    pub(crate) fn close(&self) -> Option<JoinHandle<()>> {
        let mut lifecycle = self.shared.lifecycle.lock();
        lifecycle.closed = true;
        lifecycle.task.take().map(|mut task| {
            task.signal_shutdown();
            task.handle
        })
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        let mut lifecycle = self.shared.lifecycle.lock();
        lifecycle.closed = true;
        if let Some(task) = lifecycle.task.as_mut() {
            task.signal_shutdown();
        }
    }
}

impl Shared {
    fn acquire(this: &Arc<Self>) {
        let mut lifecycle = this.lifecycle.lock();
        lifecycle.consumers += 1;
        if lifecycle.consumers != 1 || lifecycle.closed {
            return;
        }

        let previous = lifecycle.task.take().map(|task| task.handle);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(supervise(Arc::clone(this), previous, shutdown_rx));
        lifecycle.task = Some(RunningTask {
            handle,
            shutdown_tx: Some(shutdown_tx),
        });
        debug!("First consumer attached, supervising connection");
    }

    fn release(&self) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.consumers = lifecycle.consumers.saturating_sub(1);
        if lifecycle.consumers == 0 {
            if let Some(task) = lifecycle.task.as_mut() {
                debug!("Last consumer detached, tearing connection down");
                task.signal_shutdown();
            }
        }
    }

    /// Handle the events of one connection attempt until it ends
    async fn drive(
        &self,
        events: &mut RawEventStream,
        shutdown_rx: &mut oneshot::Receiver<()>,
        attempt: &mut usize,
    ) -> Outcome {
        let mut live: Option<LiveConnection> = None;

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut *shutdown_rx => {
                    if let Some(connection) = live.take() {
                        connection.retire();
                        connection.handle.close();
                        info!("Connection #{} disposed", connection.sender.connection_id());
                        self.bus
                            .publish(ApplicationEvent::Disconnected(DisconnectCause::LocalDisposal));
                    }
                    return Outcome::Shutdown;
                }
                event = events.next() => event,
            };

            match event {
                Some(RawEvent::Connected(handle)) => {
                    if let Some(previous) = live.take() {
                        previous.retire();
                    }
                    let connection = self.register_connection(handle);
                    *attempt = 0;
                    self.state.set_unless_shutting_down(ConnectionState::Connected);
                    info!("Connected (connection #{})", connection.sender.connection_id());
                    self.bus
                        .publish(ApplicationEvent::Connected(connection.sender.clone()));
                    live = Some(connection);
                }
                Some(RawEvent::TextFrame(_, text)) => self.on_frame(live.as_ref(), Frame::Text(text)),
                Some(RawEvent::BinaryFrame(_, data)) => {
                    self.on_frame(live.as_ref(), Frame::Binary(data))
                }
                Some(RawEvent::Disconnected(cause)) => {
                    self.on_disconnect(live.take(), &cause);
                    return Outcome::Ended(cause);
                }
                None => {
                    let cause = DisconnectCause::failure("event stream ended");
                    self.on_disconnect(live.take(), &cause);
                    return Outcome::Ended(cause);
                }
            }
        }
    }

    fn register_connection(&self, handle: Handle) -> LiveConnection {
        let connection_id = self.connection_ids.fetch_add(1, Ordering::Relaxed) + 1;
        let alive = Arc::new(AtomicBool::new(true));
        let sender = ConnectedSender::new(
            connection_id,
            Arc::clone(&handle),
            Arc::clone(&alive),
            Arc::clone(&self.codec),
            Arc::clone(&self.metrics),
        );
        LiveConnection {
            sender,
            alive,
            handle,
        }
    }

    fn on_frame(&self, live: Option<&LiveConnection>, frame: Frame) {
        let Some(connection) = live else {
            warn!("Dropping {}-byte frame received before Connected", frame.len());
            return;
        };

        self.metrics.increment_received();
        let event = classify(connection.sender.clone(), frame, self.codec.as_ref());
        match &event {
            ApplicationEvent::WrongMessageFormat(_, frame, error) => {
                self.metrics.increment_decode_failures();
                warn!("Wrong message format ({}): {:?}", error, frame);
            }
            ApplicationEvent::Message(_, message) => {
                debug!("Received {} message", message.message_type());
            }
            _ => {}
        }
        self.bus.publish(event);
    }

    fn on_disconnect(&self, live: Option<LiveConnection>, cause: &DisconnectCause) {
        if let Some(connection) = live {
            connection.retire();
        }
        match cause {
            DisconnectCause::TransportFailure { .. } => {
                error!("Disconnected: {}", SocketError::from(cause.clone()))
            }
            _ => info!("Disconnected: {}", cause),
        }
        self.bus
            .publish(ApplicationEvent::Disconnected(cause.clone()));
    }
}

enum Outcome {
    Shutdown,
    Ended(DisconnectCause),
}

struct LiveConnection {
    sender: ConnectedSender,
    alive: Arc<AtomicBool>,
    handle: Handle,
}

impl LiveConnection {
    fn retire(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Main supervise loop: connect, drive, back off, repeat
async fn supervise(
    shared: Arc<Shared>,
    previous: Option<JoinHandle<()>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }

    let mut attempt = 0usize;

    loop {
        shared.state.set_unless_shutting_down(if attempt == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        let opened = tokio::select! {
            biased;
            _ = &mut shutdown_rx => None,
            events = shared.transport.open() => Some(events),
        };
        let Some(mut events) = opened else {
            debug!("Shutdown requested while connecting");
            break;
        };

        let outcome = shared.drive(&mut events, &mut shutdown_rx, &mut attempt).await;
        drop(events);

        let cause = match outcome {
            Outcome::Shutdown => break,
            Outcome::Ended(cause) => cause,
        };

        if !cause.is_retryable() {
            info!("Transport disposed the connection, not reconnecting");
            break;
        }

        shared.state.set_unless_shutting_down(ConnectionState::Reconnecting);
        let delay = shared.strategy.next_delay(attempt);
        info!("Reconnecting in {:?} (attempt {})", delay, attempt + 1);

        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                debug!("Shutdown requested during reconnection delay");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        shared.metrics.increment_reconnects();
    }

    // A socket being shut down keeps its ShuttingDown state
    shared.state.set_unless_shutting_down(ConnectionState::Idle);
    debug!("Supervise task exiting");
}

/// Keeps the shared connection open while alive
pub struct ConnectionLease {
    shared: Arc<Shared>,
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.shared.release();
    }
}

impl std::fmt::Debug for ConnectionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLease").finish()
    }
}

/// Event stream of the shared connection
///
/// Dropping the last one tears the connection down.
pub struct ConnectionStream {
    events: EventStream<ApplicationEvent>,
    _lease: ConnectionLease,
}

impl ConnectionStream {
    /// Wait for the next event, `None` once the socket is shut down
    pub async fn recv(&mut self) -> Option<ApplicationEvent> {
        self.events.recv().await
    }
}

impl Stream for ConnectionStream {
    type Item = ApplicationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}
