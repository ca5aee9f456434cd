use std::collections::BTreeMap;
use std::sync::Arc;

use rowstore::{EventQueue, RowDataStore, RowRecord, StoreEvent, Subscription};

use crate::error::{ConfigError, ListError};
use crate::surface::{ListSurface, MountEdge};
use crate::window::{Layout, PageWindow, Spacers};

/// List construction options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualListOptions {
    /// Estimated row height in pixels. Corrected once against the first
    /// rendered row (see [`VirtualList::pump`]).
    pub row_height: u32,
    /// Fetch/windowing granularity.
    pub rows_per_page: u32,
    /// Initial viewport height; adapters update it via
    /// [`VirtualList::on_viewport_height`].
    pub viewport_height: u32,
    /// Initial scroll position.
    pub scroll_top: u64,
}

impl Default for VirtualListOptions {
    fn default() -> Self {
        Self {
            row_height: 60,
            rows_per_page: 25,
            viewport_height: 0,
            scroll_top: 0,
        }
    }
}

impl VirtualListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_height(mut self, row_height: u32) -> Self {
        self.row_height = row_height;
        self
    }

    pub fn with_rows_per_page(mut self, rows_per_page: u32) -> Self {
        self.rows_per_page = rows_per_page;
        self
    }

    pub fn with_viewport_height(mut self, viewport_height: u32) -> Self {
        self.viewport_height = viewport_height;
        self
    }

    pub fn with_scroll_top(mut self, scroll_top: u64) -> Self {
        self.scroll_top = scroll_top;
        self
    }
}

/// The result of resolving a click against the materialized rows.
#[derive(Clone, Debug)]
pub struct RowClick {
    pub index: u64,
    /// Snapshot of the row's data at click time; `None` while the row is
    /// still a placeholder.
    pub record: Option<Arc<RowRecord>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Unbound,
    Idle,
    Rendering,
    Disposed,
}

struct Binding {
    store: RowDataStore,
    queue: EventQueue,
    _subscription: Subscription,
}

/// A virtualized scrolling list.
///
/// Observes scroll/viewport changes and store events, keeps exactly the
/// page window around the visual center materialized as row views, and
/// sizes leading/trailing spacers so the native scrollbar reflects the
/// full content height without materializing all rows.
///
/// Adapter-driven, like the rest of this workspace: the embedder forwards
/// `on_scroll` / `on_viewport_height` from its UI events and calls
/// [`pump`](Self::pump) from its loop to apply buffered store events.
pub struct VirtualList<S: ListSurface> {
    surface: S,
    row_height: u32,
    rows_per_page: u32,
    viewport_height: u32,
    scroll_top: u64,
    data: Option<Binding>,
    rows: BTreeMap<u64, S::View>,
    last_window: Option<PageWindow>,
    calibrated: bool,
    phase: Phase,
}

impl<S: ListSurface> VirtualList<S> {
    pub fn new(surface: S, options: VirtualListOptions) -> Result<Self, ConfigError> {
        if options.rows_per_page == 0 {
            return Err(ConfigError::ZeroRowsPerPage);
        }
        if options.row_height == 0 {
            return Err(ConfigError::ZeroRowHeight);
        }
        Ok(Self {
            surface,
            row_height: options.row_height,
            rows_per_page: options.rows_per_page,
            viewport_height: options.viewport_height,
            scroll_top: options.scroll_top,
            data: None,
            rows: BTreeMap::new(),
            last_window: None,
            calibrated: false,
            phase: Phase::Unbound,
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn store(&self) -> Option<&RowDataStore> {
        self.data.as_ref().map(|b| &b.store)
    }

    /// Current row height: the configured estimate until first-row
    /// calibration corrects it.
    pub fn row_height(&self) -> u32 {
        self.row_height
    }

    pub fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    /// The currently materialized page window, if any render has happened.
    pub fn window(&self) -> Option<PageWindow> {
        self.last_window
    }

    pub fn materialized_indexes(&self) -> Vec<u64> {
        self.rows.keys().copied().collect()
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == Phase::Disposed
    }

    fn layout(&self) -> Result<Layout, ListError> {
        let binding = self.data.as_ref().ok_or(ListError::Unbound)?;
        Ok(Layout::new(
            self.row_height,
            self.rows_per_page,
            binding.store.total(),
        ))
    }

    /// Binds a data source. Any previously bound store stays alive (the
    /// caller may rebind it elsewhere); its rendered rows are unmounted and
    /// first-row calibration is re-armed.
    pub fn set_data(&mut self, store: RowDataStore) -> Result<(), ListError> {
        if self.phase == Phase::Disposed {
            return Err(ListError::Disposed);
        }
        let (queue, subscription) = store.subscribe_queue()?;
        self.unmount_all();
        self.last_window = None;
        self.calibrated = false;
        self.data = Some(Binding {
            store,
            queue,
            _subscription: subscription,
        });
        self.phase = Phase::Idle;
        Ok(())
    }

    pub fn on_scroll(&mut self, scroll_top: u64) -> Result<(), ListError> {
        self.scroll_top = scroll_top;
        self.redraw()
    }

    pub fn on_viewport_height(&mut self, viewport_height: u32) -> Result<(), ListError> {
        self.viewport_height = viewport_height;
        self.redraw()
    }

    /// Recomputes the page window and reconciles materialized rows.
    ///
    /// Identical consecutive windows are a no-op: repeated scroll events
    /// within the same window touch nothing. Otherwise rows of pages that
    /// left the window are destroyed, rows of pages that stayed are kept
    /// as-is, and rows of newly entered pages are created and mounted on
    /// the matching edge. Finally the data for the full materialized range
    /// is requested from the store; holes render as placeholders until
    /// their `RowUpdated` arrives.
    pub fn redraw(&mut self) -> Result<(), ListError> {
        match self.phase {
            Phase::Disposed => return Err(ListError::Disposed),
            Phase::Unbound => return Err(ListError::Unbound),
            Phase::Rendering | Phase::Idle => {}
        }
        self.phase = Phase::Rendering;
        let result = self.redraw_inner();
        self.phase = Phase::Idle;
        result
    }

    fn redraw_inner(&mut self) -> Result<(), ListError> {
        let layout = self.layout()?;

        let Some(window) = layout.compute_window(self.scroll_top, self.viewport_height) else {
            // Empty list: nothing to materialize.
            self.unmount_all();
            self.last_window = None;
            self.surface.set_spacers(0, 0);
            return Ok(());
        };

        if Some(window) == self.last_window {
            return Ok(());
        }
        let previous = self.last_window.replace(window);
        tracing::trace!(
            target: "pagelist",
            start_page = window.start_page,
            end_page = window.end_page,
            scroll_top = self.scroll_top,
            "window moved"
        );

        // Keep rows whose page survives in the new window; destroy the rest.
        match previous {
            Some(prev) if prev.intersects(&window) => {
                let stale: Vec<u64> = self
                    .rows
                    .keys()
                    .filter(|&&index| !window.contains_page(layout.page_of_row(index)))
                    .copied()
                    .collect();
                for index in stale {
                    if let Some(view) = self.rows.remove(&index) {
                        self.surface.unmount_row(view);
                    }
                }
            }
            _ => self.unmount_all(),
        }

        // Materialize pages that entered the window. A page below the kept
        // rows is appended; a page above them is prepended (rows mounted in
        // descending order so the surface sees ascending document order).
        for page in window.pages() {
            let start = layout.page_row_start(page);
            if self.rows.contains_key(&start) {
                continue;
            }
            let count = layout.rows_in_page(page);
            let prepend = self
                .rows
                .first_key_value()
                .is_some_and(|(&first, _)| start < first);
            let indexes = start..start + count;
            if prepend {
                for index in indexes.rev() {
                    self.create_and_mount(index, MountEdge::Leading);
                }
            } else {
                for index in indexes {
                    self.create_and_mount(index, MountEdge::Trailing);
                }
            }
        }

        self.apply_spacers(&layout, &window);

        // Request data for the materialized range and push whatever is
        // already cached; the rest arrives through pump().
        let from = layout.page_row_start(window.start_page);
        let count = self.rows.len() as u64;
        let binding = self.data.as_ref().ok_or(ListError::Unbound)?;
        let collected = binding.store.collect(from, count)?;
        for record in collected.into_iter().flatten() {
            if let Some(view) = self.rows.get_mut(&record.index()) {
                self.surface.update_row(view, &record);
            }
        }
        Ok(())
    }

    /// Applies buffered store events: arrived rows are pushed into their
    /// views, and a total change re-runs the spacer math immediately (with
    /// a full relayout only when the active window no longer matches the
    /// new total). The very first rendered row also calibrates
    /// `row_height` here, once per data binding.
    pub fn pump(&mut self) -> Result<(), ListError> {
        match self.phase {
            Phase::Disposed => return Err(ListError::Disposed),
            Phase::Unbound => return Ok(()),
            Phase::Rendering | Phase::Idle => {}
        }
        let Some(binding) = self.data.as_ref() else {
            return Ok(());
        };
        let queue = binding.queue.clone();
        let store = binding.store.clone();

        for event in queue.drain() {
            match event {
                StoreEvent::RowUpdated { index } => {
                    if let (Some(view), Some(record)) =
                        (self.rows.get_mut(&index), store.row(index))
                    {
                        self.surface.update_row(view, &record);
                        if !self.calibrated {
                            self.calibrate_first_row()?;
                        }
                    }
                }
                StoreEvent::TotalUpdated { total } => self.apply_total_update(total)?,
            }
        }
        Ok(())
    }

    /// Measures the first mounted row and, if its rendered height differs
    /// from the estimate, adopts it: all mounted rows are resized and the
    /// spacer math re-runs. At most once per data binding.
    fn calibrate_first_row(&mut self) -> Result<(), ListError> {
        let Some((_, first)) = self.rows.iter().next() else {
            return Ok(());
        };
        let Some(measured) = self.surface.measure_row(first) else {
            // Surface cannot measure yet; stay armed.
            return Ok(());
        };
        self.calibrated = true;
        if measured == 0 || measured == self.row_height {
            return Ok(());
        }
        tracing::debug!(
            target: "pagelist",
            estimated = self.row_height,
            measured,
            "correcting row height from first rendered row"
        );
        self.row_height = measured;
        for view in self.rows.values_mut() {
            self.surface.set_row_height(view, measured);
        }
        let layout = self.layout()?;
        if let Some(window) = self.last_window {
            self.apply_spacers(&layout, &window);
        }
        Ok(())
    }

    // `total` is the event payload; the layout reads the store directly, so
    // a stale queued event still resolves against the newest total.
    fn apply_total_update(&mut self, total: u64) -> Result<(), ListError> {
        let layout = self.layout()?;

        let relayout = match (self.last_window, layout.last_page_index()) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(window), Some(last)) => {
                // The window fell past the new end, or the page row counts
                // under it changed (a partial page grew or shrank).
                window.end_page > last || window.row_count(&layout) != self.rows.len() as u64
            }
        };

        if relayout {
            tracing::trace!(target: "pagelist", total, "total changed; relayout");
            self.last_window = None;
            self.redraw_inner()
        } else {
            tracing::trace!(target: "pagelist", total, "total changed; resizing spacers");
            if let Some(window) = self.last_window {
                self.apply_spacers(&layout, &window);
            }
            Ok(())
        }
    }

    /// Finds the materialized row matching a hit predicate, walking rows in
    /// index order. O(materialized count), which is at most two pages.
    pub fn resolve_click(&self, hit: impl Fn(u64, &S::View) -> bool) -> Option<RowClick> {
        let store = self.store()?;
        self.rows
            .iter()
            .find(|&(&index, view)| hit(index, view))
            .map(|(&index, _)| RowClick {
                index,
                record: store.row(index),
            })
    }

    /// Unmounts every row, disposes the bound store, and makes all further
    /// operations fail with [`ListError::Disposed`].
    pub fn dispose(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }
        self.unmount_all();
        if let Some(binding) = self.data.take() {
            binding.store.dispose();
        }
        self.last_window = None;
        self.phase = Phase::Disposed;
    }

    fn create_and_mount(&mut self, index: u64, edge: MountEdge) {
        let mut view = self.surface.create_row(index, self.row_height);
        self.surface.mount_row(&mut view, edge);
        self.rows.insert(index, view);
    }

    fn unmount_all(&mut self) {
        while let Some((_, view)) = self.rows.pop_first() {
            self.surface.unmount_row(view);
        }
    }

    fn apply_spacers(&mut self, layout: &Layout, window: &PageWindow) {
        let spacers = Spacers::for_window(layout, window, self.rows.len() as u64);
        self.surface.set_spacers(spacers.leading, spacers.trailing);
    }
}

impl<S: ListSurface> Drop for VirtualList<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
