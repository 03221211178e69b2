//! Virtualization windowing for the row × date grid.
//!
//! Sizes are fixed per axis, so every computation here is O(1) in the number
//! of rows and columns and can run on every scroll event.
//!
//! Coordinates: the viewport origin is the grid's top-left corner. The header
//! band (`header_height`) and the room label column (`fixed_column_width`) are
//! pinned; rows and date columns scroll underneath them.

use std::ops::Range;

use crate::drag::HitTest;
use crate::model::{DropTarget, Point, VisibleRow};
use crate::timeline::Timeline;

/// Fixed sizes and overscan margins, in pixels / items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub row_height: f64,
    pub column_width: f64,
    pub header_height: f64,
    pub fixed_column_width: f64,
    pub overscan_rows: usize,
    pub overscan_columns: usize,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            row_height: 50.0,
            column_width: 40.0,
            header_height: 50.0,
            fixed_column_width: 150.0,
            overscan_rows: 3,
            overscan_columns: 2,
        }
    }
}

/// Viewport size and scroll offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    pub fn scrolled(mut self, scroll_x: f64, scroll_y: f64) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }
}

/// Inclusive index range `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    pub first: usize,
    pub last: usize,
}

impl IndexWindow {
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }

    pub fn range(&self) -> Range<usize> {
        self.first..self.last + 1
    }
}

/// What to materialize for the current scroll position. `None` on an axis
/// means it has no items. The header row and label column are always drawn
/// and are not part of these windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtualWindow {
    /// Rows intersecting the viewport.
    pub visible_rows: Option<IndexWindow>,
    /// Columns intersecting the viewport.
    pub visible_columns: Option<IndexWindow>,
    /// Visible rows plus overscan, clamped.
    pub rows: Option<IndexWindow>,
    /// Visible columns plus overscan, clamped.
    pub columns: Option<IndexWindow>,
}

impl VirtualWindow {
    pub fn row_range(&self) -> Range<usize> {
        self.rows.map_or(0..0, |w| w.range())
    }

    pub fn column_range(&self) -> Range<usize> {
        self.columns.map_or(0..0, |w| w.range())
    }

    /// Number of body cells to materialize.
    pub fn cell_count(&self) -> usize {
        self.row_range().len() * self.column_range().len()
    }
}

/// One scroll axis: `(visible, with_overscan)`.
fn axis(count: usize, size: f64, scroll: f64, extent: f64, overscan: usize) -> Option<(IndexWindow, IndexWindow)> {
    if count == 0 || size <= 0.0 {
        return None;
    }
    let max = count - 1;
    let scroll = scroll.max(0.0);
    let extent = extent.max(0.0);

    let first = ((scroll / size).floor() as usize).min(max);
    let last = (((scroll + extent) / size).floor() as usize).clamp(first, max);
    let visible = IndexWindow { first, last };
    let rendered = IndexWindow {
        first: first.saturating_sub(overscan),
        last: last.saturating_add(overscan).min(max),
    };
    Some((visible, rendered))
}

/// Compute the materialization window.
pub fn window(row_count: usize, column_count: usize, metrics: &GridMetrics, viewport: &Viewport) -> VirtualWindow {
    let body_height = viewport.height - metrics.header_height;
    let body_width = viewport.width - metrics.fixed_column_width;

    let rows = axis(
        row_count,
        metrics.row_height,
        viewport.scroll_y,
        body_height,
        metrics.overscan_rows,
    );
    let columns = axis(
        column_count,
        metrics.column_width,
        viewport.scroll_x,
        body_width,
        metrics.overscan_columns,
    );

    VirtualWindow {
        visible_rows: rows.map(|(v, _)| v),
        visible_columns: columns.map(|(v, _)| v),
        rows: rows.map(|(_, r)| r),
        columns: columns.map(|(_, r)| r),
    }
}

/// Total scrollable content size (without pinned bands).
pub fn content_size(row_count: usize, column_count: usize, metrics: &GridMetrics) -> (f64, f64) {
    (
        column_count as f64 * metrics.column_width,
        row_count as f64 * metrics.row_height,
    )
}

/// Clamp scroll offsets so the viewport never scrolls past the content, e.g.
/// after a filter shrinks the row list.
pub fn clamp_scroll(viewport: &Viewport, row_count: usize, column_count: usize, metrics: &GridMetrics) -> Viewport {
    let (content_w, content_h) = content_size(row_count, column_count, metrics);
    let max_x = (content_w - (viewport.width - metrics.fixed_column_width)).max(0.0);
    let max_y = (content_h - (viewport.height - metrics.header_height)).max(0.0);
    Viewport {
        scroll_x: viewport.scroll_x.clamp(0.0, max_x),
        scroll_y: viewport.scroll_y.clamp(0.0, max_y),
        ..*viewport
    }
}

/// Hit testing and positioning against one snapshot of rows + timeline.
#[derive(Debug, Clone, Copy)]
pub struct GridGeometry<'a> {
    pub metrics: &'a GridMetrics,
    pub viewport: &'a Viewport,
    pub rows: &'a [VisibleRow],
    pub timeline: &'a Timeline,
}

impl<'a> GridGeometry<'a> {
    /// Body cell under a viewport point. Pinned bands and out-of-range
    /// positions give `None`.
    pub fn cell_at(&self, point: Point) -> Option<(usize, usize)> {
        let m = self.metrics;
        if point.x < m.fixed_column_width || point.y < m.header_height {
            return None;
        }
        if point.x >= self.viewport.width || point.y >= self.viewport.height {
            return None;
        }
        let content_x = point.x - m.fixed_column_width + self.viewport.scroll_x;
        let content_y = point.y - m.header_height + self.viewport.scroll_y;
        let column = (content_x / m.column_width).floor();
        let row = (content_y / m.row_height).floor();
        if column < 0.0 || row < 0.0 {
            return None;
        }
        let (row, column) = (row as usize, column as usize);
        (row < self.rows.len() && column < self.timeline.len()).then_some((row, column))
    }

    /// Top edge of a row in viewport coordinates.
    pub fn row_top(&self, row: usize) -> f64 {
        self.metrics.header_height + row as f64 * self.metrics.row_height - self.viewport.scroll_y
    }

    /// Left edge of a date column in viewport coordinates.
    pub fn column_left(&self, column: usize) -> f64 {
        self.metrics.fixed_column_width + column as f64 * self.metrics.column_width - self.viewport.scroll_x
    }

    /// Center of a body cell in viewport coordinates.
    pub fn cell_center(&self, row: usize, column: usize) -> Point {
        Point::new(
            self.column_left(column) + self.metrics.column_width / 2.0,
            self.row_top(row) + self.metrics.row_height / 2.0,
        )
    }
}

impl HitTest for GridGeometry<'_> {
    /// Only room rows accept drops; group headers do not.
    fn drop_target_at(&self, point: Point) -> Option<DropTarget> {
        let (row, column) = self.cell_at(point)?;
        let VisibleRow::Child { id, .. } = &self.rows[row] else {
            return None;
        };
        Some(DropTarget {
            date: self.timeline.date(column)?,
            resource_id: id.clone(),
        })
    }
}
