//! Wire format of the ticker feed
//!
//! Outbound requests are serialized from [`Request`]. Inbound frames are decoded
//! into [`FeedMessage`], classified by their `type` field before any field is
//! read. Unknown types decode to [`FeedMessage::Other`].

use super::types::{TickerMessage, Topic};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Channel name carrying ticker updates
pub const TICKER_CHANNEL: &str = "ticker";

/// Outbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    Subscribe { channels: Vec<Channel> },
    Unsubscribe { channels: Vec<Channel> },
    Heartbeat,
}

/// Channel selector inside a subscribe/unsubscribe request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub name: String,
    pub product_ids: Vec<Topic>,
}

impl Channel {
    fn ticker(product_ids: Vec<Topic>) -> Self {
        Self {
            name: TICKER_CHANNEL.to_string(),
            product_ids,
        }
    }
}

impl Request {
    /// Ticker subscription for all given topics, in one message
    pub fn subscribe(topics: impl IntoIterator<Item = Topic>) -> Self {
        Request::Subscribe {
            channels: vec![Channel::ticker(topics.into_iter().collect())],
        }
    }

    /// Ticker unsubscription for all given topics, in one message
    pub fn unsubscribe(topics: impl IntoIterator<Item = Topic>) -> Self {
        Request::Unsubscribe {
            channels: vec![Channel::ticker(topics.into_iter().collect())],
        }
    }

    /// Request kind, as written in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Subscribe { .. } => "subscribe",
            Request::Unsubscribe { .. } => "unsubscribe",
            Request::Heartbeat => "heartbeat",
        }
    }

    /// Encode as a JSON text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Inbound frame, classified by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    Ticker(TickerFrame),
    Heartbeat,
    Subscriptions,
    Error {
        #[serde(default)]
        message: String,
        #[serde(default)]
        reason: String,
    },
    #[serde(other)]
    Other,
}

impl FeedMessage {
    /// Decode one text frame
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Raw ticker payload. Numbers may arrive as strings or as JSON numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerFrame {
    pub product_id: Topic,
    pub price: Value,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub volume_24h: Option<Value>,
    #[serde(default)]
    pub low_24h: Option<Value>,
    #[serde(default)]
    pub high_24h: Option<Value>,
    #[serde(default)]
    pub open_24h: Option<Value>,
}

impl TickerFrame {
    /// Build the value handed to consumers.
    ///
    /// Returns `None` when the price is unusable. Optional 24h fields that are
    /// absent or unparsable become zero; a missing or unparsable event time falls
    /// back to `received_at`.
    pub fn into_message(self, received_at: DateTime<Utc>) -> Option<TickerMessage> {
        let price = parse_decimal(&self.price)?;

        let time = self
            .time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(received_at);

        Some(TickerMessage {
            topic: self.product_id,
            price,
            time,
            received_at,
            volume_24h: optional_decimal(self.volume_24h.as_ref()),
            low_24h: optional_decimal(self.low_24h.as_ref()),
            high_24h: optional_decimal(self.high_24h.as_ref()),
            open_24h: optional_decimal(self.open_24h.as_ref()),
        })
    }
}

fn optional_decimal(value: Option<&Value>) -> Decimal {
    value.and_then(parse_decimal).unwrap_or(Decimal::ZERO)
}

/// Parse a numeric field that may be text or a JSON number
fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
