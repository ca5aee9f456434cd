/// Fixed-granularity layout parameters for one reconciliation pass.
///
/// Rows are grouped into pages of `rows_per_page`; pages are the fetch and
/// windowing granularity. All math is integer-exact: the spacer identity
/// `leading + materialized + trailing == row_height * total` holds with no
/// rounding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout {
    pub row_height: u32,
    pub rows_per_page: u32,
    pub total: u64,
}

impl Layout {
    pub fn new(row_height: u32, rows_per_page: u32, total: u64) -> Self {
        Self {
            row_height,
            rows_per_page,
            total,
        }
    }

    pub fn page_height(&self) -> u64 {
        self.row_height as u64 * self.rows_per_page as u64
    }

    /// Height of the full scroll track: `row_height * total`.
    pub fn content_height(&self) -> u64 {
        self.row_height as u64 * self.total
    }

    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(self.rows_per_page as u64)
    }

    /// `ceil(total / rows_per_page) - 1`, or `None` for an empty list.
    pub fn last_page_index(&self) -> Option<u64> {
        self.page_count().checked_sub(1)
    }

    /// First row index of a page.
    pub fn page_row_start(&self, page: u64) -> u64 {
        page * self.rows_per_page as u64
    }

    pub fn page_of_row(&self, index: u64) -> u64 {
        index / self.rows_per_page as u64
    }

    /// Row count of a page: `rows_per_page` everywhere except a trailing
    /// partial page, which has `total mod rows_per_page` rows.
    pub fn rows_in_page(&self, page: u64) -> u64 {
        let start = self.page_row_start(page);
        if start >= self.total {
            0
        } else {
            (self.total - start).min(self.rows_per_page as u64)
        }
    }

    pub fn max_scroll_top(&self, viewport_height: u32) -> u64 {
        self.content_height().saturating_sub(viewport_height as u64)
    }

    /// Computes the page window that must be materialized for a scroll
    /// position.
    ///
    /// The window straddles the visual center: with the viewport midpoint
    /// below the midpoint of the page under `scroll_top`, the window is
    /// that page plus the next; otherwise the previous page plus that page.
    /// At the first and last page only one neighbor can exist, so a
    /// single-page window suffices there.
    ///
    /// Returns `None` for an empty list.
    pub fn compute_window(&self, scroll_top: u64, viewport_height: u32) -> Option<PageWindow> {
        let last = self.last_page_index()?;
        let page_height = self.page_height();
        if page_height == 0 {
            return None;
        }

        // Clamp for scroll positions past the end (total shrank mid-session).
        let current = (scroll_top / page_height).min(last);

        // Midpoints compared in doubled units to stay in exact integers:
        //   box midpoint  = scroll_top + viewport/2
        //   page midpoint = current*page_height + page_height/2
        let box_mid2 = 2 * scroll_top + viewport_height as u64;
        let page_mid2 = 2 * current * page_height + page_height;
        let box_above_page_mid = box_mid2 < page_mid2;

        let is_edge = (current == 0 && box_above_page_mid)
            || (current == last && !box_above_page_mid);

        if is_edge {
            return Some(PageWindow::single(current));
        }

        let start_page = if box_above_page_mid {
            current - 1
        } else {
            current
        };
        Some(PageWindow {
            start_page,
            end_page: start_page + 1,
        })
    }
}

/// A contiguous, inclusive interval of page indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageWindow {
    pub start_page: u64,
    pub end_page: u64, // inclusive
}

impl PageWindow {
    pub fn single(page: u64) -> Self {
        Self {
            start_page: page,
            end_page: page,
        }
    }

    pub fn contains_page(&self, page: u64) -> bool {
        self.start_page <= page && page <= self.end_page
    }

    pub fn intersects(&self, other: &PageWindow) -> bool {
        self.start_page <= other.end_page && other.start_page <= self.end_page
    }

    pub fn pages(&self) -> core::ops::RangeInclusive<u64> {
        self.start_page..=self.end_page
    }

    /// Total row count of the window's pages under a layout.
    pub fn row_count(&self, layout: &Layout) -> u64 {
        self.pages().map(|p| layout.rows_in_page(p)).sum()
    }
}

/// Leading/trailing spacer heights for a materialized window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spacers {
    pub leading: u64,
    pub trailing: u64,
}

impl Spacers {
    /// `leading = start_page * page_height`; `trailing` is whatever remains
    /// of `row_height * total` after the leading spacer and the
    /// materialized rows.
    pub fn for_window(layout: &Layout, window: &PageWindow, materialized_rows: u64) -> Self {
        let leading = window.start_page * layout.page_height();
        let materialized = materialized_rows * layout.row_height as u64;
        let trailing = layout
            .content_height()
            .saturating_sub(leading)
            .saturating_sub(materialized);
        Self { leading, trailing }
    }
}
