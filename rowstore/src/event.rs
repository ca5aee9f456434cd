use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

/// A typed change notification from a [`crate::RowDataStore`].
///
/// These replace path-string data change events ("$id/rows/[n]") with plain
/// values delivered via direct subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// The best-known total row count changed.
    TotalUpdated { total: u64 },
    /// The record at `index` was written (or its selection flag flipped).
    RowUpdated { index: u64 },
}

pub(crate) type Handler = Arc<dyn Fn(StoreEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

impl Subscribers {
    pub(crate) fn add(self: &Arc<Self>, handler: Handler) -> Subscription {
        let mut entries = self.entries.lock().expect("subscriber lock poisoned");
        let id = entries.next_id;
        entries.next_id += 1;
        entries.handlers.push((id, handler));
        Subscription {
            id,
            subscribers: Arc::downgrade(self),
        }
    }

    pub(crate) fn remove(&self, id: u64) {
        let mut entries = self.entries.lock().expect("subscriber lock poisoned");
        entries.handlers.retain(|(entry_id, _)| *entry_id != id);
    }

    /// Invokes every handler outside the registry lock, so a handler may
    /// call back into the store or manage subscriptions.
    pub(crate) fn emit(&self, event: StoreEvent) {
        let handlers: Vec<Handler> = {
            let entries = self.entries.lock().expect("subscriber lock poisoned");
            entries.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in handlers {
            handler(event);
        }
    }

    pub(crate) fn clear(&self) {
        let mut entries = self.entries.lock().expect("subscriber lock poisoned");
        entries.handlers.clear();
    }
}

/// A subscription token. Dropping it detaches the handler.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Leaves the handler attached for the lifetime of the store.
    pub fn detach(mut self) {
        self.subscribers = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(self.id);
        }
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Buffers [`StoreEvent`]s for a single-threaded consumer.
///
/// Fetch completions run on background tasks, but list reconciliation is
/// cooperative: subscribe a queue, then drain it from the UI loop whenever
/// convenient. Events come out in arrival order, which for a single fetch
/// means ascending index order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Arc<Mutex<VecDeque<StoreEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, event: StoreEvent) {
        self.events
            .lock()
            .expect("event queue lock poisoned")
            .push_back(event);
    }

    /// Removes and returns all buffered events.
    pub fn drain(&self) -> Vec<StoreEvent> {
        self.events
            .lock()
            .expect("event queue lock poisoned")
            .drain(..)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events
            .lock()
            .expect("event queue lock poisoned")
            .is_empty()
    }
}
