//! WebSocket transport sessions over tokio-tungstenite

use super::types::{WsCommand, WsConfig, WsError, WsEvent, WsSession};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Opens transport sessions.
///
/// Each call to [`Connector::open`] starts exactly one session. The session reports
/// its lifecycle on `WsSession::events` and ends with `WsEvent::Closed`. Reconnection is
/// the caller's business: a closed session is never revived.
pub trait Connector: Send + Sync + 'static {
    /// Start a new session. Fails synchronously only when no connection attempt can be made.
    fn open(&self) -> Result<WsSession, WsError>;
}

/// WebSocket connector backed by tokio-tungstenite
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Drive one session: handshake, then pump frames both ways until either side closes
    async fn run_session(
        request: Request,
        events: mpsc::Sender<WsEvent>,
        mut commands: mpsc::UnboundedReceiver<WsCommand>,
    ) {
        let ws_stream = tokio::select! {
            result = connect_async(request) => match result {
                Ok((stream, _response)) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket handshake failed");
                    let _ = events.send(WsEvent::Error(e.to_string())).await;
                    let _ = events.send(WsEvent::Closed).await;
                    return;
                }
            },
            _ = Self::close_requested(&mut commands) => {
                tracing::debug!("Close requested during handshake, abandoning connection");
                let _ = events.send(WsEvent::Closed).await;
                return;
            }
        };

        tracing::info!("WebSocket connected");

        if events.send(WsEvent::Opened).await.is_err() {
            return;
        }

        if let Err(e) = Self::stream(ws_stream, &events, &mut commands).await {
            tracing::warn!(error = %e, "WebSocket session failed");
            let _ = events.send(WsEvent::Error(e.to_string())).await;
        }

        let _ = events.send(WsEvent::Closed).await;
    }

    /// Resolves once the owner asks for a close or goes away
    async fn close_requested(commands: &mut mpsc::UnboundedReceiver<WsCommand>) {
        loop {
            match commands.recv().await {
                Some(WsCommand::Close) | None => return,
                Some(WsCommand::Text(_)) => {
                    tracing::debug!("Dropping frame queued before handshake completed");
                }
            }
        }
    }

    async fn stream(
        ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        events: &mpsc::Sender<WsEvent>,
        commands: &mut mpsc::UnboundedReceiver<WsCommand>,
    ) -> Result<(), WsError> {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if events.send(WsEvent::Text(text)).await.is_err() {
                                tracing::debug!("Event receiver dropped, closing connection");
                                let _ = write.close().await;
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(frame = ?frame, "Received close frame");
                            return Ok(());
                        }
                        Some(Ok(Message::Binary(data))) => {
                            tracing::trace!(len = data.len(), "Ignoring binary frame");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                    }
                }

                cmd = commands.recv() => {
                    match cmd {
                        Some(WsCommand::Text(text)) => {
                            write.send(Message::Text(text)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(WsCommand::Close) | None => {
                            tracing::debug!("Closing WebSocket on request");
                            let _ = write.close().await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

impl Connector for WsClient {
    fn open(&self) -> Result<WsSession, WsError> {
        let request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| WsError::InvalidUrl(e.to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tracing::info!(url = %self.config.url, "Connecting to WebSocket");

        tokio::spawn(Self::run_session(request, event_tx, command_rx));

        Ok(WsSession {
            events: event_rx,
            commands: command_tx,
        })
    }
}
