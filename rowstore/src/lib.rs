//! A sparse, fetch-on-demand row cache for virtualized lists.
//!
//! This crate owns the data side of a virtualized list: the best-known total
//! row count, an index-addressable cache of row records, and the single
//! in-flight fetch that fills cache holes from a remote JSON endpoint.
//!
//! It is UI-agnostic. A list layer is expected to:
//! - call [`RowDataStore::collect`] for the index range it is rendering
//! - drain typed [`StoreEvent`]s and push arriving rows into its views
//!
//! All fetch work runs on background tasks; no store operation blocks the
//! caller. The store must be used from within a tokio runtime.
#![forbid(unsafe_code)]

mod error;
mod event;
mod record;
mod store;
mod transport;


pub use error::{FetchError, StoreError};
pub use event::{EventQueue, StoreEvent, Subscription};
pub use record::RowRecord;
pub use store::{RowDataStore, RowDataStoreOptions};
pub use transport::{FetchResponse, HttpRowFetcher, RowFetcher};
