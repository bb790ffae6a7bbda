//! Ticker feed client
//!
//! Multiplexes many topic subscriptions over one WebSocket session, replays
//! them after every reconnect, and reports connection state transitions.

mod client;
mod heartbeat;
mod messages;
mod reconnect;
mod registry;
mod router;
mod status;
mod types;

pub use client::{FeedClient, FeedClientConfig, Subscription};
pub use heartbeat::{Heartbeat, HeartbeatConfig};
pub use messages::{Channel, FeedMessage, Request, TickerFrame, TICKER_CHANNEL};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use registry::{RegistrationId, SubscriptionRegistry, TickerHandler};
pub use router::{route, RouteOutcome};
pub use status::{StatusBroadcaster, StatusCallback};
pub use types::{ConnectionState, TickerMessage, Topic};

use crate::telemetry;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Which kind of consumer callback is being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallbackKind {
    Ticker,
    Status,
}

impl CallbackKind {
    fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Ticker => "ticker",
            CallbackKind::Status => "status",
        }
    }
}

/// Run a consumer callback, containing and reporting a panic.
///
/// Returns `false` if the callback panicked.
pub(crate) fn call_guarded<F: FnOnce()>(kind: CallbackKind, f: F) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!(
                callback = kind.as_str(),
                reason = %panic_reason(payload.as_ref()),
                "Consumer callback panicked"
            );
            telemetry::record_callback_panic(kind.as_str());
            false
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
