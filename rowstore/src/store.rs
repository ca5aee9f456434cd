use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::event::{EventQueue, StoreEvent, Subscribers, Subscription};
use crate::record::RowRecord;
use crate::transport::{FetchResponse, RowFetcher};

/// Store construction options.
#[derive(Clone, Copy, Debug)]
pub struct RowDataStoreOptions {
    /// The total row count assumed before the first successful fetch
    /// confirms one. A non-zero estimate lets a list materialize a first
    /// window, which in turn issues the priming fetch.
    pub initial_total: u64,

    /// When `true` (the default), the total reported by every fetch
    /// response replaces the best-known total. When `false`, the total
    /// stays at `initial_total` forever.
    pub keep_total_up_to_date: bool,
}

impl Default for RowDataStoreOptions {
    fn default() -> Self {
        Self {
            initial_total: 50,
            keep_total_up_to_date: true,
        }
    }
}

impl RowDataStoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_total(mut self, initial_total: u64) -> Self {
        self.initial_total = initial_total;
        self
    }

    pub fn with_keep_total_up_to_date(mut self, keep: bool) -> Self {
        self.keep_total_up_to_date = keep;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RequestKey {
    offset: u64,
    count: u64,
}

struct InFlight {
    key: RequestKey,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    confirmed_total: Option<u64>,
    cache: HashMap<u64, Arc<RowRecord>>,
    selected: HashSet<u64>,
    in_flight: Option<InFlight>,
    disposed: bool,
}

struct Inner {
    fetcher: Arc<dyn RowFetcher>,
    options: RowDataStoreOptions,
    state: Mutex<State>,
    subscribers: Arc<Subscribers>,
    idle: Notify,
}

/// The data side of a virtualized list: best-known total row count plus a
/// sparse, index-addressable cache of [`RowRecord`]s, filled on demand from
/// a [`RowFetcher`].
///
/// Cheap to clone (shares one inner state). Reads are immediate; cache
/// holes are filled by a single background fetch at a time. Completion
/// writes are last-write-wins per index and are announced through typed
/// [`StoreEvent`]s.
#[derive(Clone)]
pub struct RowDataStore {
    inner: Arc<Inner>,
}

impl RowDataStore {
    pub fn new(fetcher: impl RowFetcher + 'static) -> Self {
        Self::with_options(fetcher, RowDataStoreOptions::default())
    }

    pub fn with_options(fetcher: impl RowFetcher + 'static, options: RowDataStoreOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher: Arc::new(fetcher),
                options,
                state: Mutex::new(State::default()),
                subscribers: Arc::new(Subscribers::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Current best-known total. Reports the configured estimate until a
    /// fetch confirms a server total; callers must tolerate it changing
    /// asynchronously in either direction.
    pub fn total(&self) -> u64 {
        self.lock_state()
            .confirmed_total
            .unwrap_or(self.inner.options.initial_total)
    }

    /// The server-confirmed total, if any fetch has completed yet.
    pub fn confirmed_total(&self) -> Option<u64> {
        self.lock_state().confirmed_total
    }

    /// Returns the cached record at `index`, if present.
    pub fn row(&self, index: u64) -> Option<Arc<RowRecord>> {
        self.lock_state().cache.get(&index).cloned()
    }

    pub fn is_selected(&self, index: u64) -> bool {
        self.lock_state().selected.contains(&index)
    }

    /// The `(offset, count)` window of the in-flight fetch, if any.
    pub fn pending_request(&self) -> Option<(u64, u64)> {
        self.lock_state()
            .in_flight
            .as_ref()
            .map(|f| (f.key.offset, f.key.count))
    }

    pub fn is_disposed(&self) -> bool {
        self.lock_state().disposed
    }

    /// Returns the records for `[from, from + count)` that are cached right
    /// now, with `None` holes for the rest, and kicks off (or reuses) one
    /// background fetch covering the missing sub-range. Never blocks.
    ///
    /// Calling this twice in a row with no new data arriving returns the
    /// same holes both times and issues at most one fetch: an in-flight
    /// fetch for the same window is reused, while a fetch for a different
    /// window is aborted and replaced (the newest request wins).
    pub fn collect(&self, from: u64, count: u64) -> Result<Vec<Option<Arc<RowRecord>>>, StoreError> {
        let mut state = self.lock_state();
        if state.disposed {
            return Err(StoreError::Disposed);
        }

        let mut out = Vec::with_capacity(count as usize);
        for index in from..from.saturating_add(count) {
            out.push(state.cache.get(&index).cloned());
        }

        // Trim cached rows off both ends; the fetch window spans the first
        // hole through the last hole.
        let first_hole = out.iter().position(Option::is_none);
        let Some(first_hole) = first_hole else {
            return Ok(out);
        };
        let last_hole = out
            .iter()
            .rposition(Option::is_none)
            .unwrap_or(first_hole);

        let key = RequestKey {
            offset: from + first_hole as u64,
            count: (last_hole - first_hole + 1) as u64,
        };

        match &state.in_flight {
            Some(in_flight) if in_flight.key == key => {
                tracing::trace!(
                    target: "rowstore",
                    offset = key.offset,
                    count = key.count,
                    "reusing in-flight fetch"
                );
            }
            _ => {
                if let Some(stale) = state.in_flight.take() {
                    tracing::trace!(
                        target: "rowstore",
                        offset = stale.key.offset,
                        count = stale.key.count,
                        "aborting superseded fetch"
                    );
                    stale.handle.abort();
                }
                let inner = Arc::clone(&self.inner);
                let handle = tokio::spawn(async move {
                    let result = inner.fetcher.fetch(key.offset, key.count).await;
                    Inner::complete(&inner, key, result);
                });
                state.in_flight = Some(InFlight { key, handle });
            }
        }

        Ok(out)
    }

    /// Registers a handler for store events.
    pub fn subscribe(
        &self,
        handler: impl Fn(StoreEvent) + Send + Sync + 'static,
    ) -> Result<Subscription, StoreError> {
        if self.lock_state().disposed {
            return Err(StoreError::Disposed);
        }
        Ok(self.inner.subscribers.add(Arc::new(handler)))
    }

    /// Subscribes an [`EventQueue`] for cooperative consumers that drain
    /// events from their own loop instead of reacting inside the handler.
    pub fn subscribe_queue(&self) -> Result<(EventQueue, Subscription), StoreError> {
        let queue = EventQueue::new();
        let subscription = {
            let queue = queue.clone();
            self.subscribe(move |event| queue.push(event))?
        };
        Ok((queue, subscription))
    }

    /// Replaces the selected index set. Every row whose selection flag
    /// flips gets a `RowUpdated` notification so views re-render.
    pub fn set_selection(&self, indexes: &[u64]) -> Result<(), StoreError> {
        let mut changed = Vec::new();
        {
            let mut state = self.lock_state();
            if state.disposed {
                return Err(StoreError::Disposed);
            }
            let next: HashSet<u64> = indexes.iter().copied().collect();
            changed.extend(state.selected.symmetric_difference(&next).copied());
            changed.sort_unstable();
            state.selected = next;
        }
        for index in changed {
            self.inner.subscribers.emit(StoreEvent::RowUpdated { index });
        }
        Ok(())
    }

    /// Waits until no fetch is in flight. Intended for tests and graceful
    /// shutdown; normal consumers react to events instead.
    pub async fn settle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.lock_state().in_flight.is_none() {
                return;
            }
            notified.await;
        }
    }

    /// Cancels any pending fetch, releases the cache, and detaches all
    /// subscribers. Every subsequent mutating call fails with
    /// [`StoreError::Disposed`].
    pub fn dispose(&self) {
        {
            let mut state = self.lock_state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            if let Some(in_flight) = state.in_flight.take() {
                in_flight.handle.abort();
            }
            state.cache.clear();
            state.selected.clear();
        }
        self.inner.subscribers.clear();
        self.inner.idle.notify_waiters();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().expect("store state lock poisoned")
    }
}

impl Inner {
    /// Applies a fetch completion: merges the total, writes rows at their
    /// absolute indexes, then emits events outside the state lock.
    ///
    /// Events for one completion go out in ascending index order. Across
    /// overlapping completions the cache is last-write-wins per index.
    fn complete(inner: &Arc<Inner>, key: RequestKey, result: Result<FetchResponse, crate::FetchError>) {
        let mut events = Vec::new();
        {
            let mut state = inner.state.lock().expect("store state lock poisoned");
            if state.disposed {
                return;
            }
            if matches!(&state.in_flight, Some(f) if f.key == key) {
                state.in_flight = None;
            }

            match result {
                Err(err) => {
                    tracing::warn!(
                        target: "rowstore",
                        offset = key.offset,
                        count = key.count,
                        error = %err,
                        "fetch failed; holes stay unfilled until the next collect"
                    );
                }
                Ok(response) => {
                    if inner.options.keep_total_up_to_date {
                        if let Some(total) = response.total {
                            if state.confirmed_total != Some(total) {
                                state.confirmed_total = Some(total);
                                events.push(StoreEvent::TotalUpdated { total });
                            }
                        }
                    }

                    for (i, item) in response.items.into_iter().enumerate() {
                        // A null/missing element means "not available"; it
                        // must not clobber an existing cache entry.
                        let Some(payload) = item else { continue };
                        let index = key.offset + i as u64;
                        state
                            .cache
                            .insert(index, Arc::new(RowRecord::new(index, payload)));
                        events.push(StoreEvent::RowUpdated { index });
                    }
                }
            }
        }

        inner.idle.notify_waiters();
        for event in events {
            inner.subscribers.emit(event);
        }
    }
}

impl core::fmt::Debug for RowDataStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("RowDataStore")
            .field("confirmed_total", &state.confirmed_total)
            .field("cached_rows", &state.cache.len())
            .field("in_flight", &state.in_flight.as_ref().map(|p| p.key))
            .field("disposed", &state.disposed)
            .finish_non_exhaustive()
    }
}
