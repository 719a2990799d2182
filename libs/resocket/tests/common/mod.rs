//! Common test utilities for resocket integration tests
//!
//! - [`MockTransport`]: in-memory scripted transport, every `open()` is recorded
//! - [`MockWsServer`]: real WebSocket server speaking the register/ping/data protocol

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use resocket::*;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// How a mock connection answers outbound frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Responder {
    /// Never answer; the test scripts every inbound frame
    Silent,
    /// Answer `register` with `registered` only
    RegisterOnly,
    /// Answer `register`, `ping` and echo `data` with the same id
    Protocol,
}

/// Reply the protocol server sends for one request, if any
pub fn protocol_reply(request: &str, responder: Responder) -> Option<String> {
    if responder == Responder::Silent {
        return None;
    }
    let value: Value = serde_json::from_str(request).ok()?;
    let reply = match value.get("type")?.as_str()? {
        "register" => json!({"type": "registered", "response": "you are cool"}),
        "ping" if responder == Responder::Protocol => {
            json!({"type": "pong", "message": value.get("message")?})
        }
        "data" if responder == Responder::Protocol => {
            json!({"type": "data", "id": value.get("id")?, "message": value.get("message")?})
        }
        _ => return None,
    };
    Some(reply.to_string())
}

/// Outbound side of one mock connection
#[derive(Debug)]
pub struct MockHandle {
    me: Weak<MockHandle>,
    events_tx: UnboundedSender<RawEvent>,
    sent: Mutex<Vec<Frame>>,
    closed: AtomicBool,
    responder: Responder,
}

impl MockHandle {
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|frame| frame.as_text().map(str::to_string))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl ConnectionHandle for MockHandle {
    fn send(&self, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(SocketError::Send("mock connection closed".into()));
        }
        let reply = frame
            .as_text()
            .and_then(|text| protocol_reply(text, self.responder));
        self.sent.lock().push(frame);

        if let (Some(reply), Some(me)) = (reply, self.me.upgrade()) {
            let _ = self.events_tx.send(RawEvent::TextFrame(me, reply));
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Test-side view of one `open()` call
#[derive(Clone)]
pub struct MockConnection {
    pub index: usize,
    pub handle: Arc<MockHandle>,
    events_tx: UnboundedSender<RawEvent>,
}

impl MockConnection {
    /// Push a text frame as if the peer sent it
    pub fn push_text(&self, text: impl Into<String>) {
        let handle: Handle = self.handle.clone();
        let _ = self.events_tx.send(RawEvent::TextFrame(handle, text.into()));
    }

    pub fn push_binary(&self, data: Vec<u8>) {
        let handle: Handle = self.handle.clone();
        let _ = self.events_tx.send(RawEvent::BinaryFrame(handle, data));
    }

    pub fn push_registered(&self) {
        self.push_text(r#"{"type":"registered"}"#);
    }

    /// Emit `Connected` for connections opened with auto-connect off
    pub fn connect(&self) {
        let handle: Handle = self.handle.clone();
        let _ = self.events_tx.send(RawEvent::Connected(handle));
    }

    pub fn disconnect(&self, cause: DisconnectCause) {
        self.handle.close();
        let _ = self.events_tx.send(RawEvent::Disconnected(cause));
    }

    pub fn remote_close(&self, code: u16, reason: &str) {
        self.disconnect(DisconnectCause::RemoteClose {
            code,
            reason: reason.into(),
        });
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.handle.sent_texts()
    }

    /// Poll until at least `count` frames were sent
    pub async fn wait_sent(&self, count: usize) -> Vec<String> {
        loop {
            let sent = self.sent_texts();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

struct MockInner {
    responder: Responder,
    auto_connect: bool,
    failures_left: AtomicUsize,
    opens: AtomicUsize,
    streams_dropped: Arc<AtomicUsize>,
    connections: Mutex<Vec<MockConnection>>,
    opened_tx: UnboundedSender<MockConnection>,
    opened_rx: tokio::sync::Mutex<UnboundedReceiver<MockConnection>>,
}

/// Scripted in-memory transport
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    /// Connects on every open, answers nothing
    pub fn new() -> Self {
        Self::with_responder(Responder::Silent)
    }

    /// Connects on every open and answers like the protocol server
    pub fn server() -> Self {
        Self::with_responder(Responder::Protocol)
    }

    pub fn with_responder(responder: Responder) -> Self {
        Self::build(responder, true)
    }

    /// Opens never emit `Connected` on their own; see [`MockConnection::connect`]
    pub fn manual() -> Self {
        Self::build(Responder::Silent, false)
    }

    fn build(responder: Responder, auto_connect: bool) -> Self {
        let (opened_tx, opened_rx) = unbounded_channel();
        Self {
            inner: Arc::new(MockInner {
                responder,
                auto_connect,
                failures_left: AtomicUsize::new(0),
                opens: AtomicUsize::new(0),
                streams_dropped: Arc::new(AtomicUsize::new(0)),
                connections: Mutex::new(Vec::new()),
                opened_tx,
                opened_rx: tokio::sync::Mutex::new(opened_rx),
            }),
        }
    }

    /// Make the next `count` opens fail with a transport failure
    pub fn fail_next_opens(&self, count: usize) {
        self.inner.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// Number of event streams the socket has dropped
    pub fn streams_dropped(&self) -> usize {
        self.inner.streams_dropped.load(Ordering::SeqCst)
    }

    /// Number of streams currently held by the socket
    pub fn open_streams(&self) -> usize {
        self.opens() - self.streams_dropped()
    }

    pub fn connections(&self) -> Vec<MockConnection> {
        self.inner.connections.lock().clone()
    }

    /// Wait for the next successful `open()`
    pub async fn next_connection(&self) -> MockConnection {
        let mut rx = self.inner.opened_rx.lock().await;
        match rx.recv().await {
            Some(connection) => connection,
            None => panic!("mock transport dropped"),
        }
    }

    /// Poll until `count` streams were dropped
    pub async fn wait_streams_dropped(&self, count: usize) {
        while self.streams_dropped() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self) -> RawEventStream {
        let inner = &self.inner;
        let index = inner.opens.fetch_add(1, Ordering::SeqCst);
        let counter = DropCounter(Arc::clone(&inner.streams_dropped));
        verbose_println!("mock open #{}", index);

        let failed = inner
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            let event = RawEvent::Disconnected(DisconnectCause::failure("connection refused"));
            return futures::stream::unfold((Some(event), counter), |(event, counter)| async move {
                event.map(|event| (event, (None, counter)))
            })
            .boxed();
        }

        let (events_tx, events_rx) = unbounded_channel();
        let handle = Arc::new_cyclic(|me| MockHandle {
            me: me.clone(),
            events_tx: events_tx.clone(),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            responder: inner.responder,
        });
        let connection = MockConnection {
            index,
            handle,
            events_tx,
        };
        if inner.auto_connect {
            connection.connect();
        }
        inner.connections.lock().push(connection.clone());
        let _ = inner.opened_tx.send(connection);

        futures::stream::unfold((events_rx, counter), |(mut rx, counter)| async move {
            rx.recv().await.map(|event| (event, (rx, counter)))
        })
        .boxed()
    }
}

/// Build a socket over a mock transport with default timings
pub fn mock_socket(transport: MockTransport) -> Socket {
    Socket::builder()
        .transport(transport)
        .auth_token("asdf")
        .build()
        .unwrap()
}

/// Wait for the next event matching `predicate`, panicking after 10s of virtual time
pub async fn next_matching<S, F>(events: &mut S, mut predicate: F) -> ApplicationEvent
where
    S: futures::Stream<Item = ApplicationEvent> + Unpin,
    F: FnMut(&ApplicationEvent) -> bool,
{
    let wait = async {
        while let Some(event) = events.next().await {
            verbose_println!("event: {:?}", event);
            if predicate(&event) {
                return event;
            }
        }
        panic!("event stream ended");
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .unwrap_or_else(|_| panic!("no matching event within 10s"))
}

/// A WebSocket server implementing the register/ping/data protocol
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    kick: Arc<Notify>,
    accepted: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let kick = Arc::new(Notify::new());
        let accepted = Arc::new(AtomicUsize::new(0));

        let shutdown_clone = Arc::clone(&shutdown);
        let kick_clone = Arc::clone(&kick);
        let accepted_clone = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                accepted_clone.fetch_add(1, Ordering::SeqCst);
                                let shutdown = Arc::clone(&shutdown_clone);
                                let kick = Arc::clone(&kick_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown, kick).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            kick,
            accepted,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        shutdown: Arc<Notify>,
        kick: Arc<Notify>,
    ) {
        use futures::SinkExt;
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
        use tokio_tungstenite::tungstenite::protocol::CloseFrame;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = protocol_reply(&text, Responder::Protocol) {
                                if write.send(Message::Text(reply)).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                _ = kick.notified() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "bye".into(),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    break;
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Close every open connection with code 1000 and reason "bye"
    pub fn kick_all(&self) {
        self.kick.notify_waiters();
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
