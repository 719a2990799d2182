//! Interactive chat client
//!
//! Connects to a chat server, registers, and prints every event. Lines
//! typed on stdin are sent as chat messages; a `data` call is issued
//! periodically to show request/response correlation.
//!
//! Usage:
//!   cargo run --bin chat_client [config.yaml]
//!
//! Environment variables:
//!   CHAT_CONFIG_PATH - config file when no argument is given
//!   SOCKET_AUTH_TOKEN - overrides `socket.auth_token`
//!   SOCKET_URL - overrides `url`

use anyhow::{Context, Result};
use futures::StreamExt;
use resocket::{
    ApplicationEvent, KeepaliveHandle, Message, Socket, SocketError, TungsteniteTransport,
};
use resocket_chat::bin_common::{
    config_type_from_args, load_config_from_env, parse_args, BinaryRunner, RunConfig,
};
use resocket_chat::config::ChatConfig;
use resocket_chat::logging::init_tracing;
use resocket_chat::shutdown::ShutdownManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

struct ChatClient {
    run_config: RunConfig,
    config: ChatConfig,
    shutdown: ShutdownManager,
    calls_ok: Arc<AtomicU64>,
    calls_failed: Arc<AtomicU64>,
}

impl ChatClient {
    fn new(config: ChatConfig, shutdown: ShutdownManager) -> Self {
        let run_config = RunConfig::new("resocket-chat")
            .with_status_interval(Duration::from_secs(60))
            .with_work_interval(Duration::from_secs(config.request_interval_secs));
        Self {
            run_config,
            config,
            shutdown,
            calls_ok: Arc::new(AtomicU64::new(0)),
            calls_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    fn build_socket(&self) -> Result<Socket> {
        let transport = self
            .config
            .headers
            .iter()
            .fold(TungsteniteTransport::new(&self.config.url), |transport, (name, value)| {
                transport.with_header(name, value)
            });

        Socket::builder()
            .transport(transport)
            .config(self.config.socket.clone())
            .build()
            .context("Failed to build socket")
    }

    fn spawn_call(&self, socket: &Arc<Socket>, calls: &mut JoinSet<()>) {
        let socket = Arc::clone(socket);
        let ok = Arc::clone(&self.calls_ok);
        let failed = Arc::clone(&self.calls_failed);
        calls.spawn(async move {
            let started = tokio::time::Instant::now();
            match socket.call(|id| Message::data(id.to_string(), "ping")).await {
                Ok(response) => {
                    ok.fetch_add(1, Ordering::Relaxed);
                    info!("📨 Call {} answered in {:?}", response.id, started.elapsed());
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Call failed: {}", e);
                }
            }
        });
    }

    fn send_chat(&self, socket: &Socket, line: String) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let Some(sender) = socket.current_sender() else {
            warn!("Not registered yet, dropping message");
            return;
        };
        let message = Message::Chat {
            message: line.to_string(),
            from: self.config.display_name.clone(),
        };
        if let Err(e) = sender.send(&message) {
            warn!("Failed to send chat message: {}", e);
        }
    }
}

fn print_event(event: &ApplicationEvent) {
    match event {
        ApplicationEvent::Connected(sender) => {
            info!("🔌 Connected (connection #{})", sender.connection_id());
        }
        ApplicationEvent::Message(_, Message::Registered) => info!("✅ Registered"),
        ApplicationEvent::Message(_, Message::Chat { message, from }) => {
            println!("<{}> {}", from, message);
        }
        ApplicationEvent::Message(_, Message::Error { response }) => {
            error!("Server error: {}", response);
        }
        ApplicationEvent::Message(_, message) => debug!("Received {:?}", message),
        ApplicationEvent::WrongMessageFormat(_, frame, error) => {
            warn!("Undecodable frame {:?}: {}", frame, error);
        }
        ApplicationEvent::Disconnected(cause) => {
            warn!("Disconnected: {}", SocketError::from(cause.clone()))
        }
    }
}

impl BinaryRunner for ChatClient {
    async fn run(&mut self) -> Result<()> {
        self.config.log();

        let socket = Arc::new(self.build_socket()?);
        let mut events = socket.connection();
        let keepalive: Option<KeepaliveHandle> =
            self.config.keepalive.policy().map(|policy| socket.keepalive(policy));

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let mut calls = JoinSet::new();

        let request_every = self
            .run_config
            .work_interval
            .unwrap_or(Duration::from_secs(10));
        let mut request_tick = tokio::time::interval(request_every);
        request_tick.tick().await;
        let mut status_tick = tokio::time::interval(self.run_config.status_interval);
        status_tick.tick().await;

        while self.shutdown.is_running() {
            tokio::select! {
                _ = self.shutdown.wait() => break,
                event = events.next() => match event {
                    Some(event) => print_event(&event),
                    None => {
                        warn!("Event stream ended");
                        break;
                    }
                },
                line = stdin.next_line(), if stdin_open => match line {
                    Ok(Some(line)) => self.send_chat(&socket, line),
                    Ok(None) => {
                        debug!("stdin closed");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                },
                _ = request_tick.tick() => self.spawn_call(&socket, &mut calls),
                _ = status_tick.tick() => {
                    let metrics = socket.metrics();
                    info!(
                        "💓 {:?} | frames {} | sent {} | decode failures {} | reconnects {} | pending calls {}",
                        metrics.connection_state,
                        metrics.frames_received,
                        metrics.messages_sent,
                        metrics.decode_failures,
                        metrics.reconnect_count,
                        socket.pending_calls(),
                    );
                }
                Some(_) = calls.join_next(), if !calls.is_empty() => {}
            }
        }

        if let Some(keepalive) = keepalive {
            keepalive.stop();
        }
        calls.shutdown().await;
        drop(events);

        match Arc::try_unwrap(socket) {
            Ok(socket) => socket.shutdown().await,
            Err(_) => warn!("Socket still shared at shutdown, dropping it"),
        }
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!(
            "Calls answered: {} | failed: {}",
            self.calls_ok.load(Ordering::Relaxed),
            self.calls_failed.load(Ordering::Relaxed)
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    let args = parse_args();
    let config_path = load_config_from_env(config_type_from_args(&args));
    let config = ChatConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing(&config.log_level);

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let mut client = ChatClient::new(config, shutdown);
    client.execute().await
}
