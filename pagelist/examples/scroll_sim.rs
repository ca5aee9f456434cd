// Example: a headless scroll session. A text "surface" stands in for the
// DOM; rows print as placeholders until their data lands.
use async_trait::async_trait;
use pagelist::{ListSurface, MountEdge, VirtualList, VirtualListOptions};
use rowstore::{
    FetchError, FetchResponse, RowDataStore, RowDataStoreOptions, RowFetcher, RowRecord,
};
use serde_json::json;

struct Backend;

#[async_trait]
impl RowFetcher for Backend {
    async fn fetch(&self, offset: u64, count: u64) -> Result<FetchResponse, FetchError> {
        let items = (offset..offset + count)
            .map(|i| Some(json!({ "title": format!("item {i}") })))
            .collect();
        Ok(FetchResponse {
            total: Some(1_000),
            items,
        })
    }
}

struct Row {
    index: u64,
    title: Option<String>,
}

#[derive(Default)]
struct ConsoleSurface {
    order: Vec<u64>,
    spacers: (u64, u64),
}

impl ListSurface for ConsoleSurface {
    type View = Row;

    fn create_row(&mut self, index: u64, _height: u32) -> Row {
        Row { index, title: None }
    }

    fn mount_row(&mut self, view: &mut Row, edge: MountEdge) {
        match edge {
            MountEdge::Leading => self.order.insert(0, view.index),
            MountEdge::Trailing => self.order.push(view.index),
        }
    }

    fn unmount_row(&mut self, view: Row) {
        self.order.retain(|&i| i != view.index);
    }

    fn update_row(&mut self, view: &mut Row, record: &RowRecord) {
        view.title = record
            .field("title")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
    }

    fn set_row_height(&mut self, _view: &mut Row, _height: u32) {}

    fn measure_row(&mut self, _view: &Row) -> Option<u32> {
        Some(60)
    }

    fn set_spacers(&mut self, leading: u64, trailing: u64) {
        self.spacers = (leading, trailing);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let store = RowDataStore::with_options(
        Backend,
        RowDataStoreOptions::new().with_initial_total(1_000),
    );
    let mut list = VirtualList::new(
        ConsoleSurface::default(),
        VirtualListOptions::new()
            .with_row_height(60)
            .with_rows_per_page(25)
            .with_viewport_height(600),
    )
    .unwrap();
    list.set_data(store).unwrap();

    for scroll_top in [0, 4_000, 30_000, 59_400] {
        list.on_scroll(scroll_top).unwrap();
        list.store().unwrap().settle().await;
        list.pump().unwrap();

        let (leading, trailing) = list.surface().spacers;
        println!(
            "scroll={scroll_top:>6} window={:?} rows={}..={} spacers=({leading}, {trailing})",
            list.window().unwrap(),
            list.surface().order.first().unwrap(),
            list.surface().order.last().unwrap(),
        );
    }

    list.dispose();
}
