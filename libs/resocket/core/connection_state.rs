//! Lock-free connection state and counters

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of the supervised transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No consumer holds the connection open
    Idle = 0,
    /// First connection attempt in progress
    Connecting = 1,
    /// Transport connection is up
    Connected = 2,
    /// Waiting for, or performing, a retry after a disconnect
    Reconnecting = 3,
    /// The socket is being torn down
    ShuttingDown = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::ShuttingDown,
            _ => ConnectionState::Idle,
        }
    }
}

/// Atomic holder for [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// Set `state` unless the owner is already shutting down
    ///
    /// Returns `false` when the write was skipped.
    pub fn set_unless_shutting_down(&self, state: ConnectionState) -> bool {
        self.inner
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != ConnectionState::ShuttingDown as u8).then_some(state as u8)
            })
            .is_ok()
    }

    /// Set `new` only if the current state is `current`
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        self.inner
            .compare_exchange(current as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.get() == ConnectionState::ShuttingDown
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub frames_received: u64,
    pub messages_sent: u64,
    pub decode_failures: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// Counters updated from the supervisor and senders
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    frames_received: AtomicU64,
    messages_sent: AtomicU64,
    decode_failures: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, connection_state: ConnectionState) -> Metrics {
        Metrics {
            frames_received: self.frames_received(),
            messages_sent: self.messages_sent(),
            decode_failures: self.decode_failures(),
            reconnect_count: self.reconnect_count(),
            connection_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrips_through_atomic() {
        let state = AtomicConnectionState::new(ConnectionState::Idle);
        for s in [
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::ShuttingDown,
            ConnectionState::Idle,
        ] {
            state.set(s);
            assert_eq!(state.get(), s);
        }
    }

    #[test]
    fn test_shutting_down_is_sticky() {
        let state = AtomicConnectionState::new(ConnectionState::Connecting);
        assert!(state.set_unless_shutting_down(ConnectionState::Connected));
        assert_eq!(state.get(), ConnectionState::Connected);

        state.set(ConnectionState::ShuttingDown);
        assert!(!state.set_unless_shutting_down(ConnectionState::Idle));
        assert_eq!(state.get(), ConnectionState::ShuttingDown);
    }

    #[test]
    fn test_compare_exchange() {
        let state = AtomicConnectionState::new(ConnectionState::Idle);
        assert!(state
            .compare_exchange(ConnectionState::Idle, ConnectionState::Connecting)
            .is_ok());
        assert_eq!(
            state.compare_exchange(ConnectionState::Idle, ConnectionState::Connected),
            Err(ConnectionState::Connecting)
        );
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = AtomicMetrics::new();
        metrics.increment_received();
        metrics.increment_received();
        metrics.increment_sent();
        metrics.increment_decode_failures();
        metrics.increment_reconnects();

        let snapshot = metrics.snapshot(ConnectionState::Connected);
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.messages_sent, 1);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(snapshot.reconnect_count, 1);
        assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    }
}
