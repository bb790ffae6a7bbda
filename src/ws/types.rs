//! WebSocket types and configuration

use thiserror::Error;
use tokio::sync::mpsc;

/// WebSocket transport configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Capacity of the inbound event channel of each session
    pub event_buffer: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            event_buffer: 1024,
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the inbound event channel capacity
    pub fn event_buffer(mut self, n: usize) -> Self {
        self.event_buffer = n.max(1);
        self
    }
}

/// Events reported by one transport session, in the order they happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// Handshake completed, the session can carry traffic
    Opened,
    /// Text frame received
    Text(String),
    /// Transport failure; a `Closed` event follows
    Error(String),
    /// Session is over. Always the last event of a session.
    Closed,
}

/// Commands accepted by a live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsCommand {
    /// Send a text frame
    Text(String),
    /// Close the connection gracefully
    Close,
}

/// One opened transport session: an inbound event stream and an outbound command sink
#[derive(Debug)]
pub struct WsSession {
    pub events: mpsc::Receiver<WsEvent>,
    pub commands: mpsc::UnboundedSender<WsCommand>,
}

/// WebSocket errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WsError {
    /// URL could not be turned into a handshake request
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
}
