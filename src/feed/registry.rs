//! Subscription registry
//!
//! Topic → handler map. It is the only state that outlives a transport session:
//! the client replays it in full on every successful connect.

use super::types::{TickerMessage, Topic};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Consumer of ticker updates for one topic
pub type TickerHandler = Arc<dyn Fn(&TickerMessage) + Send + Sync>;

/// Identifies one registration, so a stale unsubscribe handle cannot remove a newer one
pub type RegistrationId = u64;

#[derive(Clone)]
struct Registration {
    id: RegistrationId,
    handler: TickerHandler,
}

/// One handler per topic, last writer wins
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<Topic, Registration>,
    next_id: RegistrationId,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `topic`, replacing any previous handler
    pub fn insert(&mut self, topic: Topic, handler: TickerHandler) -> RegistrationId {
        self.next_id += 1;
        let id = self.next_id;
        if self
            .entries
            .insert(topic.clone(), Registration { id, handler })
            .is_some()
        {
            tracing::debug!(topic = %topic, "Replaced existing ticker handler");
        }
        id
    }

    /// Remove `topic` if it is still held by registration `id`.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, topic: &str, id: RegistrationId) -> bool {
        match self.entries.get(topic) {
            Some(registration) if registration.id == id => {
                self.entries.remove(topic);
                true
            }
            _ => false,
        }
    }

    /// Handler currently registered for `topic`
    pub fn handler(&self, topic: &str) -> Option<TickerHandler> {
        self.entries.get(topic).map(|r| r.handler.clone())
    }

    /// All registered topics, in lexical order
    pub fn topics(&self) -> Vec<Topic> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.entries.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
