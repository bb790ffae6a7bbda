//! End-to-end tests against a local WebSocket server

use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::time::Duration;
use ticker_feed::feed::{
    ConnectionState, FeedClient, FeedClientConfig, ReconnectConfig, TickerMessage,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use crate::support::{product_ids, ticker_frame};

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for_state(client: &FeedClient, state: ConnectionState) {
    timeout(WAIT, async {
        while client.current_state() != state {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("state never reached");
}

#[tokio::test]
async fn test_ticker_delivery_and_replay_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut requests = Vec::new();

        // First session: answer the subscribe, then drop the socket without a close frame
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let msg = ws.next().await.unwrap().unwrap();
        requests.push(serde_json::from_str::<Value>(msg.to_text().unwrap()).unwrap());
        ws.send(Message::Text(ticker_frame("BTC-USD", "50000.00")))
            .await
            .unwrap();
        drop(ws);

        // Second session: expect the replay, then wait for the client to close
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let msg = ws.next().await.unwrap().unwrap();
        requests.push(serde_json::from_str::<Value>(msg.to_text().unwrap()).unwrap());
        ws.send(Message::Text(ticker_frame("BTC-USD", "50100.25")))
            .await
            .unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }

        requests
    });

    let config = FeedClientConfig {
        reconnect: ReconnectConfig::new(5, Duration::from_millis(50)),
        ..FeedClientConfig::default()
    };
    let client = FeedClient::websocket(format!("ws://{addr}"), config);

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.subscribe("BTC-USD", move |t: &TickerMessage| {
        let _ = tx.send(t.clone());
    });
    client.start();

    let first = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.topic, "BTC-USD");
    assert_eq!(first.price, dec!(50000.00));

    let second = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(second.price, dec!(50100.25));
    assert_eq!(client.current_state(), ConnectionState::Connected);
    assert_eq!(client.reconnect_attempts(), 0);

    client.close();
    let requests = timeout(WAIT, server).await.unwrap().unwrap();
    wait_for_state(&client, ConnectionState::Disconnected).await;

    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request["type"], "subscribe");
        assert_eq!(product_ids(request), vec!["BTC-USD"]);
    }
    assert!(!client.reconnect_exhausted());
}

#[tokio::test]
async fn test_unreachable_endpoint_gives_up() {
    // Bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let config = FeedClientConfig {
        reconnect: ReconnectConfig::new(2, Duration::from_millis(10)),
        ..FeedClientConfig::default()
    };
    let client = FeedClient::websocket(format!("ws://{addr}"), config);
    client.start();

    timeout(WAIT, async {
        while !client.reconnect_exhausted() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("reconnect never gave up");

    assert_eq!(client.current_state(), ConnectionState::Disconnected);
    assert_eq!(client.reconnect_attempts(), 2);
}

#[tokio::test]
async fn test_close_during_stalled_handshake() {
    // Accepts TCP but never sends the upgrade response
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, accepted_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let _ = accepted_tx.send(());
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(socket);
    });

    let client = FeedClient::websocket(format!("ws://{addr}"), FeedClientConfig::default());
    client.start();
    timeout(WAIT, accepted_rx).await.unwrap().unwrap();
    assert_eq!(client.current_state(), ConnectionState::Connecting);

    client.close();
    timeout(Duration::from_secs(3), async {
        while client.current_state() != ConnectionState::Disconnected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("close did not end the pending handshake");

    assert_eq!(client.reconnect_attempts(), 5);
    assert!(!client.reconnect_exhausted());
}
