//! Wire protocol and WebSocket transport for room synchronization.
//!
//! The protocol is JSON text frames tagged by `type`. Clients push whole
//! snapshots to a room; the relay forwards them to every other member.

use crate::element::Snapshot;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default relay endpoint used when no URL is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";

/// Messages sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room
    Join { room: String },
    /// Leave a room
    Leave { room: String },
    /// Broadcast a snapshot to the other members of a room
    PushSnapshot { room: String, elements: Snapshot },
}

/// Messages received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join
    Joined { room: String, peer_count: usize },
    /// Snapshot pushed by another member of the room
    PullSnapshot { room: String, elements: Snapshot },
    /// Error message
    Error { message: String },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

/// Events from the transport
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connected to server
    Connected,
    /// Disconnected from server
    Disconnected,
    /// Connection lost, trying again
    Reconnecting { attempt: u32 },
    /// Connection restored after `attempts` tries
    Reconnected { attempts: u32 },
    /// All reconnection attempts failed; the transport has stopped
    ReconnectFailed,
    /// Joined a room
    JoinedRoom { room: String, peer_count: usize },
    /// Received a snapshot from another member
    SnapshotReceived { room: String, snapshot: Snapshot },
    /// Error occurred
    Error { message: String },
}

impl From<ServerMessage> for SyncEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Joined { room, peer_count } => SyncEvent::JoinedRoom { room, peer_count },
            ServerMessage::PullSnapshot { room, elements } => SyncEvent::SnapshotReceived {
                room,
                snapshot: elements,
            },
            ServerMessage::Error { message } => SyncEvent::Error { message },
        }
    }
}

/// Parse one server text frame into an event.
pub fn parse_server_message(text: &str) -> Result<SyncEvent, SyncError> {
    let msg: ServerMessage = serde_json::from_str(text)?;
    Ok(msg.into())
}

/// Errors from the sync transport.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported WebSocket scheme `{0}`, expected ws or wss")]
    UnsupportedScheme(String),
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("malformed message: {0}")]
    Protocol(#[from] serde_json::Error),
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

/// Client-side connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

/// A bidirectional text pipe to the relay.
///
/// Delivery is at-most-once: a message that fails to send is not retried.
pub trait Transport {
    /// Send one text frame.
    fn send(&mut self, message: &str) -> Result<(), SyncError>;

    /// Drain pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<SyncEvent>;
}

// ============================================================================
// Native WebSocket Client
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::net::TcpStream;
    use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Instant;
    use tungstenite::stream::MaybeTlsStream;
    use tungstenite::{Message, WebSocket, connect};
    use url::Url;

    type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// How a connected session ended.
    enum SessionEnd {
        /// Closed on request; do not reconnect.
        Closed,
        /// Connection dropped; reconnect.
        Lost,
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread for non-blocking operation and reconnects
    /// on its own after the connection drops.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<SyncEvent>>,
        /// Handle to the WebSocket thread.
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected WebSocket client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to the relay described by `config`.
        pub fn connect(&mut self, config: &SyncConfig) -> Result<(), SyncError> {
            if self.cmd_tx.is_some() {
                return Err(SyncError::AlreadyConnected);
            }

            let url = Url::parse(&config.url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
            if url.scheme() != "ws" && url.scheme() != "wss" {
                return Err(SyncError::UnsupportedScheme(url.scheme().to_string()));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();
            let config = config.clone();

            let handle = thread::spawn(move || run(url, config, cmd_rx, event_tx));

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);

            Ok(())
        }

        /// Disconnect from the server.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Get current connection state.
        pub fn state(&self) -> ConnectionState {
            self.state
        }

        /// Check if connected.
        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Transport for NativeWebSocket {
        fn send(&mut self, message: &str) -> Result<(), SyncError> {
            match self.cmd_tx {
                Some(ref tx) if self.state == ConnectionState::Connected => tx
                    .send(WsCommand::Send(message.to_string()))
                    .map_err(|e| SyncError::SendFailed(e.to_string())),
                _ => Err(SyncError::NotConnected),
            }
        }

        fn poll_events(&mut self) -> Vec<SyncEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        SyncEvent::Connected | SyncEvent::Reconnected { .. } => {
                            self.state = ConnectionState::Connected
                        }
                        SyncEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        SyncEvent::Reconnecting { .. } => self.state = ConnectionState::Reconnecting,
                        SyncEvent::ReconnectFailed => self.state = ConnectionState::Error,
                        _ => {}
                    }
                    self.events.push(event);
                }
            }

            std::mem::take(&mut self.events)
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

    /// Body of the WebSocket thread: connect, serve, and reconnect until
    /// closed or out of attempts.
    fn run(url: Url, config: SyncConfig, cmd_rx: Receiver<WsCommand>, event_tx: Sender<SyncEvent>) {
        let mut attempt = 0u32;
        let mut connected_once = false;

        loop {
            log::info!("WebSocket thread: connecting to {}", url);
            match connect(url.as_str()) {
                Ok((mut socket, response)) => {
                    log::info!("WebSocket connected, status: {}", response.status());
                    let event = if connected_once {
                        SyncEvent::Reconnected { attempts: attempt }
                    } else {
                        SyncEvent::Connected
                    };
                    let _ = event_tx.send(event);
                    connected_once = true;
                    attempt = 0;

                    set_timeouts(&mut socket);
                    let end = serve(&mut socket, &cmd_rx, &event_tx);
                    let _ = event_tx.send(SyncEvent::Disconnected);
                    if let SessionEnd::Closed = end {
                        log::info!("WebSocket thread exiting");
                        return;
                    }
                }
                Err(e) => {
                    log::error!("WebSocket connection failed: {}", e);
                    let _ = event_tx.send(SyncEvent::Error {
                        message: format!("Connection failed: {}", e),
                    });
                }
            }

            attempt += 1;
            if attempt > config.reconnect_attempts {
                log::error!("Giving up after {} reconnection attempts", config.reconnect_attempts);
                let _ = event_tx.send(SyncEvent::ReconnectFailed);
                return;
            }
            log::info!("Reconnecting (attempt {}/{})", attempt, config.reconnect_attempts);
            let _ = event_tx.send(SyncEvent::Reconnecting { attempt });

            if !wait(config.reconnect_delay(), &cmd_rx) {
                return;
            }
        }
    }

    /// Sleep for `delay` while honouring close requests. Returns false when
    /// the thread should stop.
    fn wait(delay: Duration, cmd_rx: &Receiver<WsCommand>) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match cmd_rx.recv_timeout(remaining) {
                Ok(WsCommand::Send(msg)) => {
                    log::warn!("Dropping message while offline: {}", preview(&msg));
                }
                Ok(WsCommand::Close) | Err(RecvTimeoutError::Disconnected) => return false,
                Err(RecvTimeoutError::Timeout) => return true,
            }
        }
    }

    fn preview(text: &str) -> &str {
        match text.char_indices().nth(100) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }

    // Short read timeout so the loop can interleave outgoing commands.
    fn set_timeouts(socket: &mut Socket) {
        match socket.get_mut() {
            MaybeTlsStream::Plain(tcp) => {
                let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
            }
            #[allow(unreachable_patterns)]
            _ => {
                log::debug!("TLS or other stream - using default timeout handling");
            }
        }
    }

    fn serve(socket: &mut Socket, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<SyncEvent>) -> SessionEnd {
        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("WebSocket sending: {}", preview(&msg));
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("WebSocket send error: {}", e);
                        return SessionEnd::Lost;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("WebSocket close requested");
                    let _ = socket.close(None);
                    return SessionEnd::Closed;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("WebSocket command channel disconnected");
                    let _ = socket.close(None);
                    return SessionEnd::Closed;
                }
                Err(TryRecvError::Empty) => {}
            }

            match socket.read() {
                Ok(Message::Text(txt)) => {
                    log::debug!("WebSocket received: {}", preview(&txt));
                    match parse_server_message(&txt) {
                        Ok(event) => {
                            let _ = event_tx.send(event);
                        }
                        Err(e) => log::warn!("Failed to parse server message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    log::info!("WebSocket received close frame");
                    return SessionEnd::Lost;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    log::error!("WebSocket read error: {}", e);
                    return SessionEnd::Lost;
                }
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativeWebSocket;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Style, Tool};
    use kurbo::Point;

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Join {
            room: "test-room".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"join","room":"test-room"}"#);

        let msg = ClientMessage::Leave {
            room: "test-room".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"leave","room":"test-room"}"#);
    }

    #[test]
    fn test_push_snapshot_carries_flat_elements() {
        let rect = Element::new(Tool::Rectangle, Point::ZERO, Point::new(10.0, 10.0), Style::default());
        let msg = ClientMessage::PushSnapshot {
            room: "r".to_string(),
            elements: Snapshot::new(vec![rect.clone()]),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "push_snapshot");
        assert_eq!(value["elements"][0]["tool"], "rectangle");
        assert_eq!(value["elements"][0]["id"], rect.id().to_string());
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"type":"joined","room":"test","peer_count":2}"#;
        let event = parse_server_message(json).unwrap();
        assert_eq!(
            event,
            SyncEvent::JoinedRoom {
                room: "test".to_string(),
                peer_count: 2
            }
        );
    }

    #[test]
    fn test_pull_snapshot_drops_malformed_elements() {
        let json = r#"{"type":"pull_snapshot","room":"r","elements":[
            {"id":"6f1c7a4e-2d7b-4c1e-9a57-1b2a4e0f9d11","tool":"line","x1":0,"y1":0,"x2":5,"y2":5},
            {"tool":"rectangle"}
        ]}"#;
        match parse_server_message(json).unwrap() {
            SyncEvent::SnapshotReceived { room, snapshot } => {
                assert_eq!(room, "r");
                assert_eq!(snapshot.len(), 1);
                assert_eq!(snapshot.elements()[0].tool(), Tool::Line);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_message_type_is_rejected() {
        let result = parse_server_message(r#"{"type":"set_elements","elements":[]}"#);
        assert!(matches!(result, Err(SyncError::Protocol(_))));
    }

    #[test]
    fn test_sync_config_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{"url":"ws://example.test/ws"}"#).unwrap();
        assert_eq!(config.reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(1000));
        assert_eq!(SyncConfig::default().url, DEFAULT_SERVER_URL);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_connect_validates_url() {
        let mut ws = NativeWebSocket::new();
        assert!(matches!(
            ws.connect(&SyncConfig::new("not a url")),
            Err(SyncError::InvalidUrl(_))
        ));
        assert!(matches!(
            ws.connect(&SyncConfig::new("http://localhost:8080")),
            Err(SyncError::UnsupportedScheme(_))
        ));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert!(matches!(ws.send("{}"), Err(SyncError::NotConnected)));
    }
}
