//! Listener registry: event type (or wildcard) to callbacks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use groupwatch_shared::{RealtimeEnvelope, WILDCARD};

/// Callback invoked with every matching event.
pub type Listener = Arc<dyn Fn(&RealtimeEnvelope) + Send + Sync>;

struct Registration {
    id: u64,
    event_type: String,
    active: AtomicBool,
    callback: Listener,
}

/// Maps event types to their listeners.
///
/// Dispatch snapshots the matching registrations and runs them outside the
/// lock, so a listener may subscribe or unsubscribe from inside a callback.
/// A registration removed mid-dispatch is skipped.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<Arc<Registration>>>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `callback` for `event_type`, or every event for [`WILDCARD`].
    pub fn subscribe(
        self: &Arc<Self>,
        event_type: &str,
        callback: impl Fn(&RealtimeEnvelope) + Send + Sync + 'static,
    ) -> Subscription {
        let registration = Arc::new(Registration {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            event_type: event_type.to_string(),
            active: AtomicBool::new(true),
            callback: Arc::new(callback),
        });

        self.lock()
            .entry(event_type.to_string())
            .or_default()
            .push(registration.clone());

        Subscription {
            registry: Arc::downgrade(self),
            registration: Some(registration),
        }
    }

    /// Deliver to exact-type listeners, then wildcard listeners. Returns how
    /// many callbacks ran.
    pub fn dispatch(&self, envelope: &RealtimeEnvelope) -> usize {
        let snapshot: Vec<Arc<Registration>> = {
            let listeners = self.lock();
            let exact = listeners.get(&envelope.event_type).into_iter().flatten();
            let wildcard = if envelope.event_type == WILDCARD {
                None
            } else {
                listeners.get(WILDCARD)
            };
            exact.chain(wildcard.into_iter().flatten()).cloned().collect()
        };

        let mut invoked = 0;
        for registration in snapshot {
            if registration.active.load(Ordering::Acquire) {
                (registration.callback)(envelope);
                invoked += 1;
            }
        }
        invoked
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.lock().get(event_type).map_or(0, Vec::len)
    }

    fn remove(&self, registration: &Registration) {
        registration.active.store(false, Ordering::Release);
        let mut listeners = self.lock();
        if let Some(list) = listeners.get_mut(&registration.event_type) {
            list.retain(|r| r.id != registration.id);
            if list.is_empty() {
                listeners.remove(&registration.event_type);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Arc<Registration>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one registration. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<ListenerRegistry>,
    registration: Option<Arc<Registration>>,
}

impl Subscription {
    pub fn event_type(&self) -> &str {
        self.registration
            .as_ref()
            .map_or("", |r| r.event_type.as_str())
    }

    /// Remove exactly this registration.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };
        registration.active.store(false, Ordering::Release);
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&registration);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event_type", &self.event_type())
            .finish()
    }
}
