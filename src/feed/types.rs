//! Feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription key for one instrument's ticker stream (e.g. "BTC-USD").
///
/// Compared by exact string match. No case folding happens here.
pub type Topic = String;

/// Lifecycle state of the feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }

    /// Numeric code used for the connection state gauge
    pub fn code(&self) -> f64 {
        match self {
            ConnectionState::Disconnected => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Connected => 2.0,
            ConnectionState::Reconnecting => 3.0,
            ConnectionState::Error => 4.0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ticker update for one topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMessage {
    /// Product the update belongs to
    pub topic: Topic,
    /// Last trade price
    pub price: Decimal,
    /// Exchange event time
    pub time: DateTime<Utc>,
    /// Local timestamp when the frame was routed
    pub received_at: DateTime<Utc>,
    /// 24h volume (zero when the feed omits it)
    pub volume_24h: Decimal,
    /// 24h low (zero when the feed omits it)
    pub low_24h: Decimal,
    /// 24h high (zero when the feed omits it)
    pub high_24h: Decimal,
    /// Price 24h ago (zero when the feed omits it)
    pub open_24h: Decimal,
}

impl TickerMessage {
    /// Absolute price change over 24h
    pub fn change_24h(&self) -> Decimal {
        self.price - self.open_24h
    }

    /// Percentage price change over 24h, `None` without an opening price
    pub fn change_pct_24h(&self) -> Option<Decimal> {
        if self.open_24h.is_zero() {
            return None;
        }
        Some(self.change_24h() / self.open_24h * Decimal::ONE_HUNDRED)
    }
}
