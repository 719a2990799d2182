//! Periodic application-level pings
//!
//! ```text
//! interval tick ──> BestEffort:  registered? ── yes ──> ping "send_only_when_connected"
//!                                             └─ no ───> skip tick
//!               └─> Guaranteed:  wait until registered ─> ping "be_sure_to_send"
//! ```
//!
//! The first ping goes out one full interval after start. Send failures are
//! logged and the tick is not retried.

use crate::core::session::Session;
use crate::protocol::Message;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Ping payload of the best-effort policy
pub const BEST_EFFORT_PING: &str = "send_only_when_connected";

/// Ping payload of the guaranteed policy
pub const GUARANTEED_PING: &str = "be_sure_to_send";

/// How a tick behaves while no connection is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepalivePolicy {
    /// Skip the tick
    BestEffort,
    /// Hold the tick until a connection is registered
    Guaranteed,
}

impl KeepalivePolicy {
    pub fn payload(&self) -> &'static str {
        match self {
            KeepalivePolicy::BestEffort => BEST_EFFORT_PING,
            KeepalivePolicy::Guaranteed => GUARANTEED_PING,
        }
    }

    fn missed_tick_behavior(&self) -> MissedTickBehavior {
        match self {
            KeepalivePolicy::BestEffort => MissedTickBehavior::Skip,
            KeepalivePolicy::Guaranteed => MissedTickBehavior::Burst,
        }
    }
}

/// Running keepalive task; stops on [`KeepaliveHandle::stop`] or drop
#[derive(Debug)]
pub struct KeepaliveHandle {
    task: JoinHandle<()>,
    policy: KeepalivePolicy,
}

impl KeepaliveHandle {
    pub fn policy(&self) -> KeepalivePolicy {
        self.policy
    }

    pub fn stop(self) {
        // Drop aborts the task
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for KeepaliveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a keepalive task pinging through the registered session
pub fn spawn_keepalive(
    session: Session,
    policy: KeepalivePolicy,
    interval: Duration,
) -> KeepaliveHandle {
    let task = tokio::spawn(keepalive_task(session, policy, interval));
    KeepaliveHandle { task, policy }
}

async fn keepalive_task(session: Session, policy: KeepalivePolicy, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(policy.missed_tick_behavior());
    // Skip the first immediate tick
    ticker.tick().await;

    debug!("Keepalive ({:?}) started with interval: {:?}", policy, interval);
    let ping = Message::ping(policy.payload());

    loop {
        ticker.tick().await;

        let sender = match policy {
            KeepalivePolicy::BestEffort => match session.current() {
                Some(sender) => sender,
                None => {
                    debug!("Keepalive tick skipped, not registered");
                    continue;
                }
            },
            KeepalivePolicy::Guaranteed => match session.wait_connected().await {
                Ok(sender) => sender,
                Err(_) => break,
            },
        };

        match sender.send(&ping) {
            Ok(()) => debug!("Keepalive ping sent on connection #{}", sender.connection_id()),
            Err(e) => debug!("Keepalive ping failed: {}", e),
        }
    }

    debug!("Keepalive task exiting");
}
