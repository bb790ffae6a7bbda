//! Connection manager
//!
//! [`FeedClient`] owns the connection state, the subscription registry, the
//! reconnect counter and the heartbeat, all behind one mutex. Transport events
//! for the live session arrive through a single pump task, so they are applied
//! one at a time. Consumer callbacks always run with the mutex released.
//!
//! Status notices are queued under the mutex in transition order and drained
//! by one caller at a time, so every observer sees transitions in the order
//! they happened, even when several threads drive the client. A call made from
//! inside a callback queues its notices behind the one being delivered.

use super::heartbeat::{Heartbeat, HeartbeatConfig};
use super::messages::Request;
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::registry::{RegistrationId, SubscriptionRegistry, TickerHandler};
use super::router;
use super::status::{StatusBroadcaster, StatusCallback};
use super::types::{ConnectionState, TickerMessage, Topic};
use crate::telemetry;
use crate::ws::{Connector, WsClient, WsCommand, WsConfig, WsEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Tuning for the connection manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedClientConfig {
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
}

/// The session currently attached to the client
struct LiveSession {
    id: u64,
    commands: mpsc::UnboundedSender<WsCommand>,
}

/// A state waiting to be delivered to the observers registered when it was queued
struct Notice {
    state: ConnectionState,
    observers: Vec<StatusCallback>,
}

struct Core {
    state: ConnectionState,
    registry: SubscriptionRegistry,
    reconnect: ReconnectPolicy,
    heartbeat: Heartbeat,
    status: StatusBroadcaster,
    session: Option<LiveSession>,
    next_session_id: u64,
    /// Bumped by `start`, `restart` and `close`; scheduled reconnects from an older epoch are void
    epoch: u64,
    /// Set by `close`, cleared by `start`/`restart`
    stopped: bool,
    /// Automatic reconnection ran out of attempts
    gave_up: bool,
    outbox: VecDeque<Notice>,
    /// Some caller is draining `outbox`
    delivering: bool,
}

impl Core {
    /// Sole write path for the connection state. Every call is queued for observers.
    fn transition(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::info!(from = %self.state, to = %state, "Connection state changed");
        }
        self.state = state;
        telemetry::set_connection_state(state);
        self.outbox.push_back(Notice {
            state,
            observers: self.status.snapshot(),
        });
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session_id)
    }

    /// Write `request` on the live session. Only sends while connected.
    fn send(&self, request: &Request) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        let Some(session) = &self.session else {
            return false;
        };

        let json = match request.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, kind = request.kind(), "Failed to encode request");
                return false;
            }
        };

        if session.commands.send(WsCommand::Text(json)).is_err() {
            tracing::warn!(kind = request.kind(), "Transport gone, request dropped");
            return false;
        }

        tracing::debug!(kind = request.kind(), "Sent request");
        true
    }

    fn detach_session(&mut self) {
        if let Some(old) = self.session.take() {
            let _ = old.commands.send(WsCommand::Close);
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    connector: Arc<dyn Connector>,
}

/// Real-time ticker client over a single feed connection.
///
/// Cheap to clone; clones share one connection. Construct it once at the
/// composition root and hand it to consumers. Every method that may open a
/// connection or arm a timer must be called from within a tokio runtime.
#[derive(Clone)]
pub struct FeedClient {
    shared: Arc<Shared>,
}

impl fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("FeedClient")
            .field("state", &core.state)
            .field("topics", &core.registry.len())
            .field("reconnect_attempts", &core.reconnect.attempts())
            .finish()
    }
}

impl FeedClient {
    /// Create a client on top of `connector`. Nothing is opened until [`FeedClient::start`].
    pub fn new(config: FeedClientConfig, connector: Arc<dyn Connector>) -> Self {
        let core = Core {
            state: ConnectionState::Disconnected,
            registry: SubscriptionRegistry::new(),
            reconnect: ReconnectPolicy::new(config.reconnect),
            heartbeat: Heartbeat::new(config.heartbeat),
            status: StatusBroadcaster::new(),
            session: None,
            next_session_id: 0,
            epoch: 0,
            stopped: false,
            gave_up: false,
            outbox: VecDeque::new(),
            delivering: false,
        };

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                connector,
            }),
        }
    }

    /// Create a client for a WebSocket feed at `url`
    pub fn websocket(url: impl Into<String>, config: FeedClientConfig) -> Self {
        Self::new(config, Arc::new(WsClient::new(WsConfig::new(url))))
    }

    /// Open the transport.
    ///
    /// Moves to `Connecting` (unless already `Reconnecting`). A synchronous open
    /// failure moves to `Error` and goes through the normal reconnect decision.
    /// Any pending scheduled reconnect is invalidated.
    pub fn start(&self) {
        {
            let mut core = self.shared.core.lock();
            core.epoch += 1;
            core.stopped = false;
            core.gave_up = false;
            self.open_session(&mut core);
        }
        self.deliver_notices();
    }

    /// Manual restart after reconnect exhaustion or `close`: fresh attempt budget, new session
    pub fn restart(&self) {
        {
            let mut core = self.shared.core.lock();
            tracing::info!("Restarting feed connection");
            core.epoch += 1;
            core.stopped = false;
            core.gave_up = false;
            core.reconnect.reset();
            core.heartbeat.stop();
            core.detach_session();
            self.open_session(&mut core);
        }
        self.deliver_notices();
    }

    /// Close the connection and suppress any further reconnection.
    ///
    /// The transport's close event performs the `Disconnected` transition. With no
    /// live session the transition happens here.
    pub fn close(&self) {
        {
            let mut core = self.shared.core.lock();
            tracing::info!("Closing feed connection");
            core.reconnect.saturate();
            core.epoch += 1;
            core.stopped = true;
            core.gave_up = false;
            core.heartbeat.stop();

            let closing = core
                .session
                .as_ref()
                .is_some_and(|s| s.commands.send(WsCommand::Close).is_ok());

            if !closing {
                core.session = None;
                if core.state != ConnectionState::Disconnected {
                    core.transition(ConnectionState::Disconnected);
                }
            }
        }
        self.deliver_notices();
    }

    /// Register `handler` for `topic`, replacing any previous handler for it.
    ///
    /// Sends a single-topic subscribe right away when connected; otherwise the
    /// topic goes out with the replay on the next successful connect.
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, handler: F) -> Subscription
    where
        F: Fn(&TickerMessage) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let handler: TickerHandler = Arc::new(handler);

        let id = {
            let mut core = self.shared.core.lock();
            let id = core.registry.insert(topic.clone(), handler);
            core.send(&Request::subscribe([topic.clone()]));
            id
        };

        tracing::info!(topic = %topic, "Subscribed");

        Subscription {
            shared: Arc::downgrade(&self.shared),
            topic,
            id,
        }
    }

    /// Register a status observer and hand it the current state.
    ///
    /// The initial state is queued behind any transitions not yet delivered, so
    /// the observer never sees an older state after a newer one.
    pub fn on_status_change(&self, callback: StatusCallback) {
        {
            let mut core = self.shared.core.lock();
            core.status.register(callback.clone());
            let state = core.state;
            core.outbox.push_back(Notice {
                state,
                observers: vec![callback],
            });
        }
        self.deliver_notices();
    }

    /// Unregister a status observer (same `Arc` as registered). Notices already
    /// queued for it may still be delivered.
    pub fn off_status_change(&self, callback: &StatusCallback) {
        self.shared.core.lock().status.unregister(callback);
    }

    pub fn current_state(&self) -> ConnectionState {
        self.shared.core.lock().state
    }

    /// Attempts used in the current reconnect cycle
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.core.lock().reconnect.attempts()
    }

    /// True once automatic reconnection has given up. Cleared by `start`,
    /// `restart` and `close`; never set by a requested close.
    pub fn reconnect_exhausted(&self) -> bool {
        self.shared.core.lock().gave_up
    }

    /// Topics currently registered
    pub fn subscribed_topics(&self) -> Vec<Topic> {
        self.shared.core.lock().registry.topics()
    }

    /// Drain queued status notices unless another caller already is
    fn deliver_notices(&self) {
        {
            let mut core = self.shared.core.lock();
            if core.delivering {
                return;
            }
            core.delivering = true;
        }

        loop {
            let notice = {
                let mut core = self.shared.core.lock();
                match core.outbox.pop_front() {
                    Some(notice) => notice,
                    None => {
                        core.delivering = false;
                        return;
                    }
                }
            };
            for observer in &notice.observers {
                StatusBroadcaster::notify(observer, notice.state);
            }
        }
    }

    fn open_session(&self, core: &mut Core) {
        if core.state != ConnectionState::Reconnecting {
            core.transition(ConnectionState::Connecting);
        }
        core.detach_session();

        match self.shared.connector.open() {
            Ok(session) => {
                core.next_session_id += 1;
                let id = core.next_session_id;
                core.session = Some(LiveSession {
                    id,
                    commands: session.commands,
                });
                tokio::spawn(pump(Arc::downgrade(&self.shared), id, session.events));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to open feed connection");
                core.transition(ConnectionState::Error);
                self.schedule_reconnect(core);
            }
        }
    }

    /// Reconnect decision path
    fn schedule_reconnect(&self, core: &mut Core) {
        let Some(delay) = core.reconnect.next_delay() else {
            if core.stopped {
                tracing::debug!("Connection closed on request, not reconnecting");
            } else {
                tracing::error!(
                    max_attempts = core.reconnect.max_attempts(),
                    "Reconnect attempts exhausted, giving up until restarted"
                );
                core.gave_up = true;
                telemetry::record_reconnect_exhausted();
                if core.state != ConnectionState::Disconnected {
                    core.transition(ConnectionState::Disconnected);
                }
            }
            return;
        };

        let attempt = core.reconnect.attempts();
        core.transition(ConnectionState::Reconnecting);
        telemetry::record_reconnect_attempt();
        tracing::warn!(
            attempt,
            max_attempts = core.reconnect.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let epoch = core.epoch;
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                FeedClient { shared }.reconnect_if_current(epoch);
            }
        });
    }

    fn reconnect_if_current(&self, epoch: u64) {
        {
            let mut core = self.shared.core.lock();
            if core.epoch != epoch {
                tracing::debug!("Dropping stale scheduled reconnect");
                return;
            }
            self.open_session(&mut core);
        }
        self.deliver_notices();
    }

    fn handle_event(&self, session_id: u64, event: WsEvent) {
        match event {
            WsEvent::Text(text) => self.handle_frame(session_id, &text),
            WsEvent::Opened => self.handle_opened(session_id),
            WsEvent::Error(reason) => self.handle_error(session_id, &reason),
            WsEvent::Closed => self.handle_closed(session_id),
        }
    }

    fn handle_frame(&self, session_id: u64, text: &str) {
        if !self.shared.core.lock().is_current(session_id) {
            return;
        }

        router::route(text, |topic| self.shared.core.lock().registry.handler(topic));
    }

    fn handle_opened(&self, session_id: u64) {
        {
            let mut core = self.shared.core.lock();
            if !core.is_current(session_id) {
                return;
            }
            if core.stopped {
                tracing::debug!("Session opened after close, ignoring");
                return;
            }

            core.transition(ConnectionState::Connected);
            core.reconnect.reset();

            let topics = core.registry.topics();
            if !topics.is_empty() {
                let count = topics.len();
                if core.send(&Request::subscribe(topics)) {
                    tracing::info!(topics = count, "Replayed subscriptions");
                }
            }

            let shared = Arc::downgrade(&self.shared);
            core.heartbeat.start(move || match shared.upgrade() {
                Some(shared) => {
                    if shared.core.lock().send(&Request::Heartbeat) {
                        telemetry::record_heartbeat();
                    }
                    true
                }
                None => false,
            });
        }
        self.deliver_notices();
    }

    fn handle_error(&self, session_id: u64, reason: &str) {
        {
            let mut core = self.shared.core.lock();
            if !core.is_current(session_id) {
                return;
            }
            tracing::warn!(%reason, "Transport error");
            core.heartbeat.stop();
            core.transition(ConnectionState::Error);
        }
        self.deliver_notices();
    }

    fn handle_closed(&self, session_id: u64) {
        {
            let mut core = self.shared.core.lock();
            if !core.is_current(session_id) {
                return;
            }
            core.session = None;
            core.heartbeat.stop();
            core.transition(ConnectionState::Disconnected);
            self.schedule_reconnect(&mut core);
        }
        self.deliver_notices();
    }
}

/// Feed one session's events into the client until the session closes
async fn pump(shared: Weak<Shared>, session_id: u64, mut events: mpsc::Receiver<WsEvent>) {
    loop {
        let event = events.recv().await.unwrap_or(WsEvent::Closed);
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let closed = event == WsEvent::Closed;
        FeedClient { shared }.handle_event(session_id, event);
        if closed {
            return;
        }
    }
}

/// Handle returned by [`FeedClient::subscribe`].
///
/// Dropping it keeps the subscription alive; call [`Subscription::unsubscribe`].
pub struct Subscription {
    shared: Weak<Shared>,
    topic: Topic,
    id: RegistrationId,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Remove the topic from the registry and, when connected, unsubscribe upstream.
    ///
    /// Safe to call repeatedly. Does nothing if a later `subscribe` on the same
    /// topic replaced this registration.
    pub fn unsubscribe(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let mut core = shared.core.lock();
        if core.registry.remove(&self.topic, self.id) {
            core.send(&Request::unsubscribe([self.topic.clone()]));
            tracing::info!(topic = %self.topic, "Unsubscribed");
        }
    }
}
