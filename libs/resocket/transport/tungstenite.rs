//! WebSocket transport over `tokio-tungstenite`
//!
//! Every [`Transport::open`] performs one connection attempt and, when it
//! succeeds, spawns a task that owns the socket:
//!
//! ```text
//!   handle.send(frame) ──> outbound channel ──┐
//!                                             v
//!   peer <════════════ WebSocket ═══════ connection task ──> event channel ──> RawEventStream
//! ```
//!
//! The task ends, closing the socket, when the peer closes, when the
//! handle is closed, or when the event stream is dropped.

use crate::traits::*;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{http, Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connects to a fixed WebSocket URL
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    url: String,
    headers: Vec<(String, String)>,
}

impl TungsteniteTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header to the upgrade request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self) -> std::result::Result<Request, WsError> {
        let mut request = self.url.as_str().into_client_request()?;

        for (key, value) in &self.headers {
            match key.parse::<http::header::HeaderName>() {
                Ok(header_name) => match value.parse::<http::header::HeaderValue>() {
                    Ok(header_value) => {
                        request.headers_mut().insert(header_name, header_value);
                    }
                    Err(_) => {
                        warn!("Invalid header value for key '{}': {}", key, value);
                    }
                },
                Err(_) => {
                    warn!("Invalid header name: {}", key);
                }
            }
        }

        Ok(request)
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn open(&self) -> RawEventStream {
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to create request for {}: {}", self.url, e);
                return single_disconnect(DisconnectCause::failure(e.to_string()));
            }
        };

        debug!("Connecting to {}", self.url);
        match connect_async(request).await {
            Ok((ws_stream, _)) => {
                info!("Connected to {}", self.url);
                let (events_tx, events_rx) = unbounded_channel();
                let (outbound_tx, outbound_rx) = unbounded_channel();
                let handle: Handle = Arc::new(TungsteniteHandle {
                    outbound: Mutex::new(Some(outbound_tx)),
                });

                let _ = events_tx.send(RawEvent::Connected(Arc::clone(&handle)));
                tokio::spawn(run_connection(ws_stream, events_tx, outbound_rx, handle));

                receiver_stream(events_rx)
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", self.url, e);
                let response = match &e {
                    WsError::Http(response) => Some(HandshakeResponse {
                        status: response.status().as_u16(),
                        reason: response
                            .status()
                            .canonical_reason()
                            .unwrap_or_default()
                            .to_string(),
                    }),
                    _ => None,
                };
                single_disconnect(DisconnectCause::TransportFailure {
                    message: e.to_string(),
                    response,
                })
            }
        }
    }
}

/// Outbound side handed to the session layer
#[derive(Debug)]
struct TungsteniteHandle {
    outbound: Mutex<Option<UnboundedSender<Frame>>>,
}

impl ConnectionHandle for TungsteniteHandle {
    fn send(&self, frame: Frame) -> Result<()> {
        match self.outbound.lock().as_ref() {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| SocketError::Send("connection closed".to_string())),
            None => Err(SocketError::Send("connection closed".to_string())),
        }
    }

    fn close(&self) {
        self.outbound.lock().take();
    }
}

async fn run_connection(
    ws_stream: WsStream,
    events_tx: UnboundedSender<RawEvent>,
    mut outbound_rx: UnboundedReceiver<Frame>,
    handle: Handle,
) {
    let (mut write, mut read) = ws_stream.split();

    let cause = loop {
        tokio::select! {
            _ = events_tx.closed() => {
                debug!("Event stream dropped, closing WebSocket");
                let _ = write.close().await;
                return;
            }

            frame = outbound_rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write.send(to_ws_message(frame)).await {
                        break DisconnectCause::failure(format!("send failed: {}", e));
                    }
                }
                None => {
                    debug!("Handle closed, closing WebSocket");
                    let _ = write.close().await;
                    break DisconnectCause::LocalDisposal;
                }
            },

            msg = read.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = events_tx.send(RawEvent::TextFrame(Arc::clone(&handle), text));
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    let _ = events_tx.send(RawEvent::BinaryFrame(Arc::clone(&handle), data));
                }
                Some(Ok(WsMessage::Ping(_))) => {
                    // The pong is queued by tungstenite; flushing puts it on the wire
                    if let Err(e) = write.flush().await {
                        break DisconnectCause::failure(format!("pong failed: {}", e));
                    }
                }
                Some(Ok(WsMessage::Pong(_))) | Some(Ok(WsMessage::Frame(_))) => {}
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.into_owned()),
                        None => (u16::from(CloseCode::Status), String::new()),
                    };
                    break DisconnectCause::RemoteClose { code, reason };
                }
                Some(Err(e)) => {
                    break DisconnectCause::failure(e.to_string());
                }
                None => {
                    break DisconnectCause::failure("WebSocket stream ended");
                }
            },
        }
    };

    handle.close();
    let _ = events_tx.send(RawEvent::Disconnected(cause));
}

fn to_ws_message(frame: Frame) -> WsMessage {
    match frame {
        Frame::Text(text) => WsMessage::Text(text),
        Frame::Binary(data) => WsMessage::Binary(data),
    }
}

fn single_disconnect(cause: DisconnectCause) -> RawEventStream {
    futures::stream::once(async move { RawEvent::Disconnected(cause) }).boxed()
}

fn receiver_stream(rx: UnboundedReceiver<RawEvent>) -> RawEventStream {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .boxed()
}
