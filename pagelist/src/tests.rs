use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rowstore::{
    FetchError, FetchResponse, RowDataStore, RowDataStoreOptions, RowFetcher, RowRecord,
};
use serde_json::json;

use crate::{
    Layout, ListError, ListSurface, MountEdge, PageWindow, Spacers, VirtualList,
    VirtualListOptions,
};

// ---------------------------------------------------------------------------
// window math

fn layout(total: u64) -> Layout {
    Layout::new(60, 10, total)
}

#[test]
fn window_straddles_the_viewport_center() {
    // Page height 600, viewport midpoint at 760 sits above the midpoint of
    // page 1 (900), so the window is the previous page plus the current one.
    let window = layout(40).compute_window(610, 300).unwrap();
    assert_eq!(window, PageWindow { start_page: 0, end_page: 1 });

    // Midpoint at 1210 is below 900: current page plus the next.
    let window = layout(40).compute_window(1060, 300).unwrap();
    assert_eq!(window, PageWindow { start_page: 1, end_page: 2 });
}

#[test]
fn top_and_bottom_edges_get_single_page_windows() {
    let l = layout(40);
    assert_eq!(l.compute_window(0, 300), Some(PageWindow::single(0)));

    let bottom = l.max_scroll_top(300);
    assert_eq!(bottom, 2100);
    assert_eq!(l.compute_window(bottom, 300), Some(PageWindow::single(3)));
}

#[test]
fn scroll_past_the_end_clamps_to_the_last_page() {
    // A stale scroll position after the total shrank.
    let window = layout(12).compute_window(3000, 300).unwrap();
    assert_eq!(window, PageWindow::single(1));
}

#[test]
fn empty_list_has_no_window() {
    assert_eq!(layout(0).compute_window(0, 300), None);
}

#[test]
fn trailing_page_may_be_partial() {
    let l = layout(45);
    assert_eq!(l.page_count(), 5);
    assert_eq!(l.last_page_index(), Some(4));
    assert_eq!(l.rows_in_page(3), 10);
    assert_eq!(l.rows_in_page(4), 5);
    assert_eq!(l.rows_in_page(5), 0);
}

#[test]
fn spacers_and_rows_always_sum_to_content_height() {
    let l = layout(45);
    for scroll_top in (0..=l.max_scroll_top(300)).step_by(37) {
        let window = l.compute_window(scroll_top, 300).unwrap();
        let rows = window.row_count(&l);
        let spacers = Spacers::for_window(&l, &window, rows);
        assert_eq!(
            spacers.leading + rows * 60 + spacers.trailing,
            l.content_height(),
            "broken at scroll_top={scroll_top}"
        );
    }
}

#[test]
fn example_scenario_has_exact_spacer_heights() {
    // 40 rows of 60px in pages of 10, scrolled to 610 with a 300px viewport.
    let l = layout(40);
    let window = l.compute_window(610, 300).unwrap();
    let spacers = Spacers::for_window(&l, &window, window.row_count(&l));
    assert_eq!(spacers, Spacers { leading: 0, trailing: 1200 });

    let bottom = l.compute_window(l.max_scroll_top(300), 300).unwrap();
    let spacers = Spacers::for_window(&l, &bottom, bottom.row_count(&l));
    assert_eq!(spacers, Spacers { leading: 1800, trailing: 0 });
}

// ---------------------------------------------------------------------------
// engine

/// Serves `row-{index}` titles for every index below a fixed total.
struct PageFetcher {
    total: u64,
    calls: Arc<Mutex<Vec<(u64, u64)>>>,
}

impl PageFetcher {
    fn new(total: u64) -> Self {
        Self {
            total,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> Arc<Mutex<Vec<(u64, u64)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RowFetcher for PageFetcher {
    async fn fetch(&self, offset: u64, count: u64) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push((offset, count));
        let end = offset.saturating_add(count).min(self.total);
        let items = (offset..end)
            .map(|i| Some(json!({ "title": format!("row-{i}") })))
            .collect();
        Ok(FetchResponse {
            total: Some(self.total),
            items,
        })
    }
}

struct TestView {
    index: u64,
    height: u32,
    title: Option<String>,
}

/// Records mount order, spacer sizes, and create/destroy counts.
#[derive(Default)]
struct TestSurface {
    mounted: Vec<u64>,
    spacers: (u64, u64),
    created: usize,
    destroyed: usize,
    measured_height: Option<u32>,
}

impl ListSurface for TestSurface {
    type View = TestView;

    fn create_row(&mut self, index: u64, height: u32) -> TestView {
        self.created += 1;
        TestView {
            index,
            height,
            title: None,
        }
    }

    fn mount_row(&mut self, view: &mut TestView, edge: MountEdge) {
        match edge {
            MountEdge::Leading => self.mounted.insert(0, view.index),
            MountEdge::Trailing => self.mounted.push(view.index),
        }
    }

    fn unmount_row(&mut self, view: TestView) {
        self.destroyed += 1;
        self.mounted.retain(|&i| i != view.index);
    }

    fn update_row(&mut self, view: &mut TestView, record: &RowRecord) {
        view.title = record
            .field("title")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
    }

    fn set_row_height(&mut self, view: &mut TestView, height: u32) {
        view.height = height;
    }

    fn measure_row(&mut self, _view: &TestView) -> Option<u32> {
        self.measured_height
    }

    fn set_spacers(&mut self, leading: u64, trailing: u64) {
        self.spacers = (leading, trailing);
    }
}

fn options() -> VirtualListOptions {
    VirtualListOptions::new()
        .with_row_height(60)
        .with_rows_per_page(10)
        .with_viewport_height(300)
}

fn list_over(fetcher: PageFetcher, initial_total: u64) -> VirtualList<TestSurface> {
    let store = RowDataStore::with_options(
        fetcher,
        RowDataStoreOptions::new().with_initial_total(initial_total),
    );
    let mut list = VirtualList::new(TestSurface::default(), options()).unwrap();
    list.set_data(store).unwrap();
    list
}

async fn settle_and_pump(list: &mut VirtualList<TestSurface>) {
    list.store().unwrap().settle().await;
    list.pump().unwrap();
}

#[test]
fn zero_granularity_is_rejected() {
    let bad = options().with_rows_per_page(0);
    assert!(VirtualList::new(TestSurface::default(), bad).is_err());
    let bad = options().with_row_height(0);
    assert!(VirtualList::new(TestSurface::default(), bad).is_err());
}

#[test]
fn redraw_before_set_data_is_an_error() {
    let mut list = VirtualList::new(TestSurface::default(), options()).unwrap();
    assert_eq!(list.redraw(), Err(ListError::Unbound));
}

#[tokio::test]
async fn first_redraw_materializes_placeholders_and_primes_one_fetch() {
    let fetcher = PageFetcher::new(40);
    let calls = fetcher.calls();
    let mut list = list_over(fetcher, 40);

    list.redraw().unwrap();

    // Viewport midpoint above page 0's midpoint: single-page window.
    assert_eq!(list.window(), Some(PageWindow::single(0)));
    assert_eq!(list.materialized_indexes(), (0..10).collect::<Vec<_>>());
    assert_eq!(list.surface().mounted, (0..10).collect::<Vec<_>>());
    assert_eq!(list.surface().spacers, (0, 1800));
    assert_eq!(list.store().unwrap().pending_request(), Some((0, 10)));

    settle_and_pump(&mut list).await;
    assert_eq!(calls.lock().unwrap().as_slice(), &[(0, 10)]);
}

#[tokio::test]
async fn rows_fill_in_once_the_fetch_lands() {
    let mut list = list_over(PageFetcher::new(40), 40);
    list.redraw().unwrap();
    settle_and_pump(&mut list).await;

    let record = list.store().unwrap().row(3).unwrap();
    assert_eq!(record.field("title").unwrap(), "row-3");

    let click = list.resolve_click(|index, _| index == 3).unwrap();
    assert_eq!(click.index, 3);
    assert!(click.record.is_some());
}

#[tokio::test]
async fn identical_windows_make_redraw_a_no_op() {
    let fetcher = PageFetcher::new(40);
    let calls = fetcher.calls();
    let mut list = list_over(fetcher, 40);

    list.on_scroll(610).unwrap();
    settle_and_pump(&mut list).await;
    let created = list.surface().created;

    // Different scroll offsets, same window.
    list.on_scroll(620).unwrap();
    list.on_scroll(600).unwrap();

    assert_eq!(list.surface().created, created);
    assert_eq!(list.surface().destroyed, 0);
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn sliding_down_keeps_the_shared_page() {
    let mut list = list_over(PageFetcher::new(40), 40);

    list.on_scroll(610).unwrap(); // window {0,1}
    settle_and_pump(&mut list).await;
    assert_eq!(list.window(), Some(PageWindow { start_page: 0, end_page: 1 }));
    assert_eq!(list.surface().created, 20);

    list.on_scroll(1250).unwrap(); // window {1,2}
    assert_eq!(list.window(), Some(PageWindow { start_page: 1, end_page: 2 }));
    assert_eq!(list.materialized_indexes(), (10..30).collect::<Vec<_>>());
    assert_eq!(list.surface().mounted, (10..30).collect::<Vec<_>>());
    // Page 1 survived: only page 2 was created, only page 0 destroyed.
    assert_eq!(list.surface().created, 30);
    assert_eq!(list.surface().destroyed, 10);
}

#[tokio::test]
async fn sliding_up_prepends_in_document_order() {
    let mut list = list_over(PageFetcher::new(40), 40);

    list.on_scroll(1250).unwrap(); // window {1,2}
    settle_and_pump(&mut list).await;

    list.on_scroll(610).unwrap(); // window {0,1}
    assert_eq!(list.surface().mounted, (0..20).collect::<Vec<_>>());
    assert_eq!(list.surface().spacers, (0, 1200));
}

#[tokio::test]
async fn distant_jump_replaces_every_row() {
    let mut list = list_over(PageFetcher::new(40), 40);

    list.redraw().unwrap(); // page {0}
    settle_and_pump(&mut list).await;

    let bottom = Layout::new(60, 10, 40).max_scroll_top(300);
    list.on_scroll(bottom).unwrap(); // page {3}, no overlap
    assert_eq!(list.materialized_indexes(), (30..40).collect::<Vec<_>>());
    assert_eq!(list.surface().destroyed, 10);
    assert_eq!(list.surface().spacers, (1800, 0));
}

#[tokio::test]
async fn first_rendered_row_calibrates_the_row_height() {
    let mut list = list_over(PageFetcher::new(40), 40);
    list.surface_mut().measured_height = Some(84);

    list.redraw().unwrap();
    assert_eq!(list.row_height(), 60);

    settle_and_pump(&mut list).await;
    assert_eq!(list.row_height(), 84);
    // Content height is now 84 * 40 = 3360; ten 84px rows are mounted.
    assert_eq!(list.surface().spacers, (0, 3360 - 840));

    // One-shot: a later differing measurement is ignored.
    list.surface_mut().measured_height = Some(120);
    list.store().unwrap().set_selection(&[0]).unwrap();
    list.pump().unwrap();
    assert_eq!(list.row_height(), 84);
}

#[tokio::test]
async fn shrinking_total_forces_a_relayout() {
    // The estimate says 100 rows but the server only has 12.
    let mut list = list_over(PageFetcher::new(12), 100);

    list.on_scroll(3000).unwrap(); // window {4,5} under the estimate
    assert_eq!(list.materialized_indexes(), (40..60).collect::<Vec<_>>());

    settle_and_pump(&mut list).await;

    // Confirmed total 12: the old window fell off the end entirely.
    assert_eq!(list.store().unwrap().confirmed_total(), Some(12));
    assert_eq!(list.window(), Some(PageWindow::single(1)));
    assert_eq!(list.materialized_indexes(), vec![10, 11]);
    assert_eq!(list.surface().spacers, (600, 0));

    // The relayout issued a fetch for the real rows.
    settle_and_pump(&mut list).await;
    let record = list.store().unwrap().row(11).unwrap();
    assert_eq!(record.field("title").unwrap(), "row-11");
}

#[tokio::test]
async fn growing_total_only_resizes_spacers() {
    // Estimate 20 rows, server has 40: the window stays put.
    let fetcher = PageFetcher::new(40);
    let mut list = list_over(fetcher, 20);

    list.redraw().unwrap(); // page {0}
    let created = list.surface().created;

    settle_and_pump(&mut list).await;
    assert_eq!(list.window(), Some(PageWindow::single(0)));
    assert_eq!(list.surface().created, created);
    assert_eq!(list.surface().spacers, (0, 1800));
}

#[tokio::test]
async fn selection_change_rerenders_the_flipped_row() {
    let mut list = list_over(PageFetcher::new(40), 40);
    list.redraw().unwrap();
    settle_and_pump(&mut list).await;

    let store = list.store().unwrap().clone();
    store.set_selection(&[2]).unwrap();
    list.pump().unwrap();
    assert!(store.is_selected(2));
}

#[tokio::test]
async fn rebinding_data_resets_rows_and_calibration() {
    let mut list = list_over(PageFetcher::new(40), 40);
    list.surface_mut().measured_height = Some(84);
    list.redraw().unwrap();
    settle_and_pump(&mut list).await;
    assert_eq!(list.row_height(), 84);

    let first = list.store().unwrap().clone();
    let second = RowDataStore::with_options(
        PageFetcher::new(30),
        RowDataStoreOptions::new().with_initial_total(30),
    );
    list.set_data(second).unwrap();

    // Old rows are gone, the old store is untouched, and nothing renders
    // until the next redraw.
    assert!(list.materialized_indexes().is_empty());
    assert!(!first.is_disposed());
    assert_eq!(list.window(), None);

    list.surface_mut().measured_height = Some(48);
    list.redraw().unwrap();
    settle_and_pump(&mut list).await;
    assert_eq!(list.row_height(), 48);
}

#[tokio::test]
async fn resolve_click_misses_outside_the_window() {
    let mut list = list_over(PageFetcher::new(40), 40);
    list.redraw().unwrap(); // rows 0..10 materialized
    settle_and_pump(&mut list).await;

    assert!(list.resolve_click(|index, _| index == 25).is_none());
}

#[tokio::test]
async fn dispose_tears_down_rows_and_the_store() {
    let mut list = list_over(PageFetcher::new(40), 40);
    list.redraw().unwrap();
    settle_and_pump(&mut list).await;

    let store = list.store().unwrap().clone();
    list.dispose();

    assert!(list.is_disposed());
    assert!(store.is_disposed());
    assert!(list.surface().mounted.is_empty());
    assert_eq!(list.redraw(), Err(ListError::Disposed));
    assert_eq!(list.on_scroll(0), Err(ListError::Disposed));
}
