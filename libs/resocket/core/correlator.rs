//! Request/response correlation over the shared event stream
//!
//! A call registers a waiter under its id before sending, so a fast
//! response can never slip past it. The dispatcher resolves waiters from
//! `data` messages with a matching id; unmatched responses are ignored.

use crate::core::bus::EventStream;
use crate::core::events::ApplicationEvent;
use crate::core::session::Session;
use crate::protocol::{DataMessage, Message};
use crate::traits::{Result, SocketError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Identifier correlating a request with its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(u64);

impl CorrelationId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id counter, starting at 0
#[derive(Debug, Default)]
pub struct CorrelationIds {
    next: Mutex<u64>,
}

impl CorrelationIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> CorrelationId {
        let mut next = self.next.lock();
        let id = CorrelationId(*next);
        *next += 1;
        id
    }
}

type Waiters = Arc<Mutex<HashMap<String, oneshot::Sender<DataMessage>>>>;

/// Waiters for in-flight calls, keyed by correlation id
#[derive(Clone, Default)]
pub struct PendingRequests {
    waiters: Waiters,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter; it is removed again when the guard drops
    pub fn register(&self, id: &CorrelationId) -> PendingGuard {
        let key = id.to_string();
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(key.clone(), tx);
        PendingGuard {
            key,
            rx,
            waiters: Arc::clone(&self.waiters),
        }
    }

    /// Hand a response to its waiter
    ///
    /// Returns false when nobody is waiting for that id.
    pub fn complete(&self, response: DataMessage) -> bool {
        let waiter = self.waiters.lock().remove(&response.id);
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One registered waiter
pub struct PendingGuard {
    key: String,
    rx: oneshot::Receiver<DataMessage>,
    waiters: Waiters,
}

impl PendingGuard {
    async fn wait(&mut self) -> Result<DataMessage> {
        (&mut self.rx).await.map_err(|_| SocketError::Closed)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.waiters.lock().remove(&self.key);
    }
}

/// Spawn the task resolving waiters from received `data` messages
pub(crate) fn spawn_dispatcher(
    mut events: EventStream<ApplicationEvent>,
    pending: PendingRequests,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let ApplicationEvent::Message(_, Message::Data(response)) = event {
                let id = response.id.clone();
                if pending.complete(response) {
                    trace!("Resolved call {}", id);
                } else {
                    debug!("No call waiting for data response {}", id);
                }
            }
        }
        debug!("Call dispatcher exiting");
    })
}

/// Issues correlated calls against a session
pub struct Correlator {
    session: Session,
    ids: CorrelationIds,
    pending: PendingRequests,
    timeout: Duration,
}

impl Correlator {
    pub(crate) fn new(session: Session, pending: PendingRequests, timeout: Duration) -> Self {
        Self {
            session,
            ids: CorrelationIds::new(),
            pending,
            timeout,
        }
    }

    pub fn next_id(&self) -> CorrelationId {
        self.ids.next_id()
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Send a request once registered and wait for its matching `data` response
    ///
    /// The call only starts its timer after the request went out, so time
    /// spent waiting for registration does not count against it.
    pub async fn call<F>(&self, build_request: F) -> Result<DataMessage>
    where
        F: FnOnce(&CorrelationId) -> Message,
    {
        let sender = self.session.wait_connected().await?;
        let id = self.next_id();
        let mut guard = self.pending.register(&id);

        sender.send(&build_request(&id))?;
        debug!("Call {} sent on connection #{}", id, sender.connection_id());

        match tokio::time::timeout(self.timeout, guard.wait()).await {
            Ok(result) => result,
            Err(_) => Err(SocketError::Timeout(format!(
                "no response to call {} within {:?}",
                id, self.timeout
            ))),
        }
    }
}
