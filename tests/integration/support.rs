//! In-memory transport for driving the feed client from tests

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ticker_feed::feed::{FeedClient, FeedClientConfig};
use ticker_feed::ws::{Connector, WsCommand, WsError, WsEvent, WsSession};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Test-side end of one session
pub struct Remote {
    pub events: mpsc::Sender<WsEvent>,
    pub commands: mpsc::UnboundedReceiver<WsCommand>,
    pub opened_at: Instant,
}

impl Remote {
    /// Deliver an event and let the client process it
    pub async fn emit(&self, event: WsEvent) {
        let _ = self.events.send(event).await;
        settle().await;
    }

    /// Everything the client has written so far
    pub fn drain(&mut self) -> Vec<WsCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.commands.try_recv() {
            out.push(cmd);
        }
        out
    }

    /// Text frames the client has written so far, decoded
    pub fn sent_json(&mut self) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter_map(|cmd| match cmd {
                WsCommand::Text(text) => Some(serde_json::from_str(&text).expect("client sent invalid JSON")),
                WsCommand::Close => None,
            })
            .collect()
    }
}

pub struct TestConnector {
    remotes: mpsc::UnboundedSender<Remote>,
    pub fail: AtomicBool,
}

impl Connector for TestConnector {
    fn open(&self) -> Result<WsSession, WsError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WsError::InvalidUrl("refused by test".into()));
        }
        let (event_tx, event_rx) = mpsc::channel(64);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let _ = self.remotes.send(Remote {
            events: event_tx,
            commands: command_rx,
            opened_at: Instant::now(),
        });
        Ok(WsSession {
            events: event_rx,
            commands: command_tx,
        })
    }
}

pub fn test_client(
    config: FeedClientConfig,
) -> (FeedClient, Arc<TestConnector>, mpsc::UnboundedReceiver<Remote>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connector = Arc::new(TestConnector {
        remotes: tx,
        fail: AtomicBool::new(false),
    });
    let client = FeedClient::new(config, connector.clone());
    (client, connector, rx)
}

/// Let spawned tasks run without moving the clock
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn ticker_frame(topic: &str, price: &str) -> String {
    serde_json::json!({
        "type": "ticker",
        "product_id": topic,
        "price": price,
        "time": "2024-01-01T00:00:00.000000Z",
        "volume_24h": "1000",
    })
    .to_string()
}

/// Product ids of a subscribe/unsubscribe request
pub fn product_ids(request: &Value) -> Vec<String> {
    request["channels"][0]["product_ids"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
