use crate::core::builder::{states::NoTransport, SocketBuilder};
use crate::core::bus::{EventBus, EventStream};
use crate::core::config::SocketConfig;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
use crate::core::correlator::{self, CorrelationId, Correlator, PendingRequests};
use crate::core::events::{ApplicationEvent, ConnectedSender};
use crate::core::keepalive::{spawn_keepalive, KeepaliveHandle, KeepalivePolicy};
use crate::core::session::{self, Session};
use crate::core::supervisor::{ConnectionLease, ConnectionStream, ConnectionSupervisor};
use crate::protocol::{DataMessage, Message};
use crate::traits::*;
use futures::stream::BoxStream;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Collaborators assembled by the builder
pub(crate) struct SocketParts {
    pub transport: Arc<dyn Transport>,
    pub codec: Arc<dyn MessageCodec>,
    pub strategy: Arc<dyn ReconnectionStrategy>,
    pub config: SocketConfig,
}

/// Session-aware socket over a self-healing transport connection
///
/// Nothing is opened until the first consumer subscribes with
/// [`Socket::connection`], [`Socket::connected_and_registered`] or
/// [`Socket::call`]. The connection is torn down when the last consumer
/// lets go.
pub struct Socket {
    supervisor: ConnectionSupervisor,
    bus: EventBus<ApplicationEvent>,
    session: Session,
    correlator: Correlator,
    config: SocketConfig,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    tasks: Vec<JoinHandle<()>>,
}

impl Socket {
    /// Create a new socket builder
    pub fn builder() -> SocketBuilder<NoTransport> {
        SocketBuilder::new()
    }

    /// Wire the socket together; spawns its internal tasks
    pub(crate) fn new(parts: SocketParts) -> Self {
        let SocketParts {
            transport,
            codec,
            strategy,
            config,
        } = parts;

        let bus = EventBus::new();
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Idle));
        let metrics = Arc::new(AtomicMetrics::new());

        // Internal listeners subscribe before any connection can exist
        let (session, tracker) = session::spawn_tracker(bus.subscribe(), config.auth_token.clone());
        let pending = PendingRequests::new();
        let dispatcher = correlator::spawn_dispatcher(bus.subscribe(), pending.clone());

        let supervisor = ConnectionSupervisor::new(
            transport,
            codec,
            strategy,
            bus.clone(),
            Arc::clone(&state),
            Arc::clone(&metrics),
        );
        let correlator = Correlator::new(session.clone(), pending, config.request_timeout());

        Self {
            supervisor,
            bus,
            session,
            correlator,
            config,
            state,
            metrics,
            tasks: vec![tracker, dispatcher],
        }
    }

    /// Shared stream of application events
    ///
    /// Holding the stream keeps the connection open.
    pub fn connection(&self) -> ConnectionStream {
        self.supervisor.connection()
    }

    /// Observe events without holding the connection open
    pub fn events(&self) -> EventStream<ApplicationEvent> {
        self.bus.subscribe()
    }

    /// Stream of the connected-and-registered state, starting with the current value
    ///
    /// Holding the stream keeps the connection open.
    pub fn connected_and_registered(&self) -> RegisteredStream {
        RegisteredStream {
            updates: self.session.updates(),
            _lease: self.supervisor.lease(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current registered sender, if any
    pub fn current_sender(&self) -> Option<ConnectedSender> {
        self.session.current()
    }

    /// Send a request built around a fresh id and wait for its `data` response
    ///
    /// Keeps the connection open for the duration of the call.
    pub async fn call<F>(&self, build_request: F) -> Result<DataMessage>
    where
        F: FnOnce(&CorrelationId) -> Message,
    {
        let _lease = self.supervisor.lease();
        self.correlator.call(build_request).await
    }

    /// Allocate a correlation id without sending anything
    pub fn next_id(&self) -> CorrelationId {
        self.correlator.next_id()
    }

    /// Number of calls still waiting for a response
    pub fn pending_calls(&self) -> usize {
        self.correlator.pending().len()
    }

    /// Start a keepalive at the configured interval
    ///
    /// The keepalive does not hold the connection open by itself.
    pub fn keepalive(&self, policy: KeepalivePolicy) -> KeepaliveHandle {
        spawn_keepalive(
            self.session.clone(),
            policy,
            self.config.keepalive_interval(),
        )
    }

    /// Hold the connection open without consuming events
    pub fn lease(&self) -> ConnectionLease {
        self.supervisor.lease()
    }

    /// Number of streams, leases and in-flight calls holding the connection
    pub fn consumer_count(&self) -> usize {
        self.supervisor.consumer_count()
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot(self.state.get())
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Tear the connection down and end every event stream
    pub async fn shutdown(mut self) {
        info!("Shutting down socket");

        // Set before signalling so the supervise task leaves it in place
        self.state.set(ConnectionState::ShuttingDown);
        if let Some(handle) = self.supervisor.close() {
            let _ = handle.await;
        }

        // Closing the bus ends every listener, internal ones included
        self.bus.close();
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }

        debug!("Socket shut down");
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.supervisor.close();
        self.bus.close();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Stream of connected-and-registered states
///
/// Yields `Some(sender)` once a connection registers and `None` when it
/// goes away.
pub struct RegisteredStream {
    updates: BoxStream<'static, Option<ConnectedSender>>,
    _lease: ConnectionLease,
}

impl Stream for RegisteredStream {
    type Item = Option<ConnectedSender>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.updates.as_mut().poll_next(cx)
    }
}
