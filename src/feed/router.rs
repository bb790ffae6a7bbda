//! Inbound frame routing
//!
//! Decodes one frame, and for ticker updates on a registered topic calls the
//! topic's handler before returning. Nothing in here can fail the connection.

use super::messages::FeedMessage;
use super::registry::TickerHandler;
use super::{call_guarded, CallbackKind};
use crate::telemetry;
use chrono::Utc;

/// What happened to one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteOutcome {
    /// Handler ran to completion
    Delivered,
    /// Ticker for a topic nobody is subscribed to
    Unrouted,
    /// Valid frame of a type this client does not consume
    Ignored,
    /// Frame failed to decode, or carried an unusable price
    Malformed,
    /// Handler panicked; the panic was contained
    HandlerPanicked,
}

impl RouteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteOutcome::Delivered => "delivered",
            RouteOutcome::Unrouted => "unrouted",
            RouteOutcome::Ignored => "ignored",
            RouteOutcome::Malformed => "malformed",
            RouteOutcome::HandlerPanicked => "handler_panicked",
        }
    }
}

/// Route one text frame. `lookup` resolves a topic to its current handler.
pub fn route<F>(text: &str, lookup: F) -> RouteOutcome
where
    F: FnOnce(&str) -> Option<TickerHandler>,
{
    let outcome = classify_and_dispatch(text, lookup);
    telemetry::record_frame(outcome);
    outcome
}

fn classify_and_dispatch<F>(text: &str, lookup: F) -> RouteOutcome
where
    F: FnOnce(&str) -> Option<TickerHandler>,
{
    let message = match FeedMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::trace!(
                error = %e,
                preview = %text.chars().take(100).collect::<String>(),
                "Dropping undecodable frame"
            );
            return RouteOutcome::Malformed;
        }
    };

    let frame = match message {
        FeedMessage::Ticker(frame) => frame,
        FeedMessage::Error { message, reason } => {
            tracing::warn!(%message, %reason, "Feed reported an error");
            return RouteOutcome::Ignored;
        }
        FeedMessage::Heartbeat | FeedMessage::Subscriptions | FeedMessage::Other => {
            return RouteOutcome::Ignored;
        }
    };

    let Some(handler) = lookup(&frame.product_id) else {
        tracing::trace!(topic = %frame.product_id, "No handler for ticker");
        return RouteOutcome::Unrouted;
    };

    let Some(ticker) = frame.into_message(Utc::now()) else {
        tracing::debug!("Dropping ticker with unusable price");
        return RouteOutcome::Malformed;
    };

    if call_guarded(CallbackKind::Ticker, || handler(&ticker)) {
        RouteOutcome::Delivered
    } else {
        RouteOutcome::HandlerPanicked
    }
}
