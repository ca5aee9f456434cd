use thiserror::Error;

/// A failed remote fetch.
///
/// Fetch errors never propagate out of [`crate::RowDataStore::collect`]: the
/// pending request slot is freed, the holes stay holes, and the next
/// `collect` touching the same range retries naturally. They surface here
/// only for transports and logging.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    /// The response body did not match the configured key paths.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// An operation was attempted on a store in an illegal state.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("row data store used after dispose()")]
    Disposed,
}
