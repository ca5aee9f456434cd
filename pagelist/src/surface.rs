use rowstore::RowRecord;

/// Where a freshly created row view enters the mounted row sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountEdge {
    /// Insert before every currently mounted row. The engine mounts a
    /// prepended page's rows in descending index order, so a surface that
    /// always inserts at position 0 ends up with ascending document order.
    Leading,
    /// Append after every currently mounted row.
    Trailing,
}

/// The rendering surface a [`crate::VirtualList`] draws into.
///
/// The engine is headless: everything DOM-shaped (element creation, tree
/// mutation, measurement, spacer elements) lives behind this trait. A view
/// starts out as an empty placeholder of the given height and shows content
/// only once [`update_row`](ListSurface::update_row) delivers a record.
pub trait ListSurface {
    type View;

    fn create_row(&mut self, index: u64, height: u32) -> Self::View;

    fn mount_row(&mut self, view: &mut Self::View, edge: MountEdge);

    fn unmount_row(&mut self, view: Self::View);

    fn update_row(&mut self, view: &mut Self::View, record: &RowRecord);

    fn set_row_height(&mut self, view: &mut Self::View, height: u32);

    /// The rendered height of a mounted row, or `None` if the surface
    /// cannot measure yet. Used once per data binding to correct the
    /// estimated row height.
    fn measure_row(&mut self, view: &Self::View) -> Option<u32>;

    /// Sizes the non-interactive leading/trailing spacers so the scroll
    /// track reflects total content height. Chunking oversized spacer
    /// elements (browser max-height limits) is the surface's concern.
    fn set_spacers(&mut self, leading: u64, trailing: u64);
}
