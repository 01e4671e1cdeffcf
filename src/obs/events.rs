//! Client Events
//!
//! Listener registry for the client's own lifecycle events and for
//! server-pushed notifications keyed by `update-type`.
//! Listeners run in registration order.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Lifecycle events raised by the client itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Transport opened and authentication succeeded
    Open,
    /// Transport closed
    Close,
    /// Transport opened but authentication failed; `Open` will never follow
    AuthFailed,
}

pub type LifecycleListener = Arc<dyn Fn() + Send + Sync>;
pub type UpdateListener = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    lifecycle: HashMap<Lifecycle, Vec<LifecycleListener>>,
    updates: HashMap<String, Vec<UpdateListener>>,
}

/// Ordered listener lists per event.
///
/// Emitting snapshots the list first, so a listener may register further
/// listeners without deadlocking; those take effect from the next emit.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RwLock<Listeners>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_lifecycle<F>(&self, event: Lifecycle, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .lifecycle
            .entry(event)
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn on_update<F>(&self, update_type: impl Into<String>, listener: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .updates
            .entry(update_type.into())
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn emit_lifecycle(&self, event: Lifecycle) {
        let snapshot: Vec<LifecycleListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lifecycle
            .get(&event)
            .cloned()
            .unwrap_or_default();
        for listener in snapshot {
            listener();
        }
    }

    /// Returns the number of listeners invoked.
    pub fn emit_update(&self, update_type: &str, payload: &Value) -> usize {
        let snapshot: Vec<UpdateListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .updates
            .get(update_type)
            .cloned()
            .unwrap_or_default();
        for listener in &snapshot {
            listener(payload);
        }
        snapshot.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_update_listeners_run_in_registration_order() {
        let emitter = EventEmitter::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            emitter.on_update("SwitchScenes", move |_| calls.lock().unwrap().push(tag));
        }

        let invoked = emitter.emit_update("SwitchScenes", &json!({}));
        assert_eq!(invoked, 3);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_update_listeners_only_see_their_tag() {
        let emitter = EventEmitter::new();
        let calls = Arc::new(Mutex::new(0));

        let c = Arc::clone(&calls);
        emitter.on_update("X", move |_| *c.lock().unwrap() += 1);

        assert_eq!(emitter.emit_update("Y", &json!({})), 0);
        assert_eq!(emitter.emit_update("X", &json!({})), 1);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_lifecycle_events_are_independent() {
        let emitter = EventEmitter::new();
        let opened = Arc::new(Mutex::new(0));

        let o = Arc::clone(&opened);
        emitter.on_lifecycle(Lifecycle::Open, move || *o.lock().unwrap() += 1);

        emitter.emit_lifecycle(Lifecycle::Close);
        assert_eq!(*opened.lock().unwrap(), 0);
        emitter.emit_lifecycle(Lifecycle::Open);
        assert_eq!(*opened.lock().unwrap(), 1);
    }

    #[test]
    fn test_listener_may_register_during_emit() {
        let emitter = Arc::new(EventEmitter::new());
        let inner = Arc::clone(&emitter);
        emitter.on_lifecycle(Lifecycle::Open, move || {
            inner.on_lifecycle(Lifecycle::Close, || {});
        });

        emitter.emit_lifecycle(Lifecycle::Open);
    }
}
