//! WebSocket transport
//!
//! One session per `open()`: the session reports `Opened`, text frames,
//! errors and a final `Closed`, and accepts outbound text and close commands.
//! Reconnection and resubscription live one level up, in the feed client.

mod client;
mod types;

pub use client::{Connector, WsClient};
pub use types::{WsCommand, WsConfig, WsError, WsEvent, WsSession};
