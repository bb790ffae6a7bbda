//! Connection status fan-out

use super::types::ConnectionState;
use super::{call_guarded, CallbackKind};
use parking_lot::Mutex;
use std::sync::Arc;

/// Observer of connection state transitions
pub type StatusCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Ordered observer list. Identity is the `Arc` allocation.
#[derive(Default)]
pub struct StatusBroadcaster {
    observers: Mutex<Vec<StatusCallback>>,
}

fn same_observer(a: &StatusCallback, b: &StatusCallback) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` unless it is already registered. Returns whether it was added.
    pub fn register(&self, callback: StatusCallback) -> bool {
        let mut observers = self.observers.lock();
        if observers.iter().any(|o| same_observer(o, &callback)) {
            return false;
        }
        observers.push(callback);
        true
    }

    /// Remove `callback`. Returns whether it was registered.
    pub fn unregister(&self, callback: &StatusCallback) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|o| !same_observer(o, callback));
        observers.len() != before
    }

    /// Deliver `state` to one observer, containing any panic
    pub fn notify(callback: &StatusCallback, state: ConnectionState) -> bool {
        call_guarded(CallbackKind::Status, || callback(state))
    }

    /// Current observers in registration order
    pub fn snapshot(&self) -> Vec<StatusCallback> {
        self.observers.lock().clone()
    }

    /// Deliver `state` to every observer in registration order.
    ///
    /// Runs on a snapshot of the list, so observers may register or unregister
    /// from inside their callback.
    pub fn broadcast(&self, state: ConnectionState) {
        for observer in &self.snapshot() {
            Self::notify(observer, state);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }
}
