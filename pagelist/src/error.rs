use rowstore::StoreError;
use thiserror::Error;

/// Invalid construction parameters. Fatal and reported synchronously.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rows_per_page must be non-zero")]
    ZeroRowsPerPage,

    #[error("row_height must be non-zero")]
    ZeroRowHeight,
}

/// An operation was attempted on a list in an illegal state.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("virtual list used after dispose()")]
    Disposed,

    #[error("no data source bound; call set_data() first")]
    Unbound,

    #[error(transparent)]
    Store(#[from] StoreError),
}
