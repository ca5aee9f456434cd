//! A page-windowed virtual list engine.
//!
//! Rows are grouped into fixed-size pages; at any scroll position the engine
//! materializes the one or two pages straddling the viewport's visual
//! center and sizes two spacers so the scroll track keeps its full height.
//! Row data comes from a [`rowstore::RowDataStore`]; holes render as
//! placeholders and fill in as fetches land.
//!
//! The engine is headless. Rendering goes through the [`ListSurface`]
//! trait, so the same reconciliation logic drives a DOM, a TUI grid, or the
//! recording surface the tests use.
#![forbid(unsafe_code)]

mod error;
mod list;
mod surface;
mod window;

#[cfg(test)]
mod tests;

pub use error::{ConfigError, ListError};
pub use list::{RowClick, VirtualList, VirtualListOptions};
pub use surface::{ListSurface, MountEdge};
pub use window::{Layout, PageWindow, Spacers};
