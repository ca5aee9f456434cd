// Example: a store over a simulated slow endpoint, showing hole-filling,
// request coalescing, and newest-wins replacement.
use std::time::Duration;

use async_trait::async_trait;
use rowstore::{FetchError, FetchResponse, RowDataStore, RowFetcher, StoreEvent};
use serde_json::json;

struct SlowFetcher;

#[async_trait]
impl RowFetcher for SlowFetcher {
    async fn fetch(&self, offset: u64, count: u64) -> Result<FetchResponse, FetchError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let items = (offset..offset + count)
            .map(|i| Some(json!({ "title": format!("row #{i}") })))
            .collect();
        Ok(FetchResponse {
            total: Some(888),
            items,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let store = RowDataStore::new(SlowFetcher);
    let _sub = store
        .subscribe(|event| {
            if let StoreEvent::TotalUpdated { total } = event {
                println!("total confirmed: {total}");
            }
        })
        .unwrap();

    // First pass: nothing cached, one fetch primed for the whole range.
    let rows = store.collect(0, 10).unwrap();
    println!(
        "holes before fetch: {}",
        rows.iter().filter(|r| r.is_none()).count()
    );
    println!("pending: {:?}", store.pending_request());

    // Scrolling away before the fetch lands replaces it.
    let _ = store.collect(500, 10).unwrap();
    println!("pending after jump: {:?}", store.pending_request());

    store.settle().await;
    let rows = store.collect(500, 10).unwrap();
    for record in rows.into_iter().flatten().take(3) {
        println!("{} => {}", record.index(), record.field("title").unwrap());
    }

    store.dispose();
}
