use std::ops::Range;

use chrono::NaiveDate;

use crate::config::GridConfig;
use crate::drag::DragPhase;
use crate::filter::FilterState;
use crate::hierarchy;
use crate::layout::{self, CellRole, Placement};
use crate::model::*;
use crate::selection::SelectionPhase;
use crate::timeline::{self, Column, Timeline};
use crate::virtualize::{self, GridGeometry, GridMetrics, Viewport, VirtualWindow};

use super::{geometry, Controller};

/// A booking block positioned in a row.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingView {
    pub booking_id: BookingId,
    pub text: String,
    pub placement: Placement,
    /// Offset from the start of the date area, before scrolling.
    pub left_px: f64,
    pub width_px: f64,
    pub back_color: String,
    pub bar_color: String,
    /// Being dragged; rendered at `Frame::drag_offset`.
    pub dragging: bool,
}

/// One materialized row. Label and cells come from the same row entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub index: usize,
    pub row: VisibleRow,
    /// Top edge in viewport coordinates.
    pub top_px: f64,
    pub bookings: Vec<BookingView>,
    /// Highlighted columns of an active selection on this row.
    pub selected: Option<Range<usize>>,
}

/// Everything needed to draw the current scroll position.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub window: VirtualWindow,
    pub columns: Vec<Column>,
    pub rows: Vec<RowView>,
    pub drag_offset: Option<Point>,
    pub drop_target: Option<DropTarget>,
    /// Total scrollable size `(width, height)` without the pinned bands.
    pub content_size: (f64, f64),
}

/// Grid-cell rendering path.
#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    pub resource_id: String,
    pub date: NaiveDate,
    pub occupant: Option<(BookingId, CellRole)>,
    pub selected: bool,
    pub drop_target: bool,
}

impl Controller {
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn grid_metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Source tree, including current expansion state.
    pub fn resources(&self) -> &[ResourceGroup] {
        &self.resources
    }

    /// Tree after filtering; what the rows were flattened from.
    pub fn filtered_resources(&self) -> &[ResourceGroup] {
        &self.filtered
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Flattened rows after filtering. Both the label column and the date
    /// cells read this list.
    pub fn rows(&self) -> &[VisibleRow] {
        &self.rows
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    pub fn selection_phase(&self) -> &SelectionPhase {
        self.selection.phase()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.selection()
    }

    pub fn drag_phase(&self) -> &DragPhase {
        self.drag.phase()
    }

    pub fn last_load_error(&self) -> Option<&str> {
        self.last_load_error.as_deref()
    }

    pub fn load_generation(&self) -> u64 {
        self.loader.generation()
    }

    pub fn geometry(&self) -> GridGeometry<'_> {
        geometry(&self.metrics, &self.viewport, &self.rows, &self.timeline)
    }

    pub fn booking(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| &b.id == id)
    }

    /// A room's bookings in input order.
    pub fn bookings_for<'a>(&'a self, resource_id: &str) -> impl Iterator<Item = &'a Booking> + use<'a> {
        self.by_resource
            .get(resource_id)
            .map(|idx| idx.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.bookings[i])
    }

    pub fn booking_placement(&self, id: &BookingId) -> Option<Placement> {
        layout::place_booking(self.booking(id)?, &self.timeline)
    }

    /// Inclusive day count of the current selection, for the confirmation
    /// surface.
    pub fn selection_days(&self) -> Option<i64> {
        let sel = self.selection.selection()?;
        Some(timeline::day_count(sel.start_date, sel.end_date))
    }

    /// Columns highlighted by the selection, clipped to the axis.
    fn selected_columns(&self, resource_id: &str) -> Option<Range<usize>> {
        let sel = self.selection.selection()?;
        if sel.resource_id != resource_id || self.timeline.is_empty() {
            return None;
        }
        let (lo, hi) = if sel.start_date <= sel.end_date {
            (sel.start_date, sel.end_date)
        } else {
            (sel.end_date, sel.start_date)
        };
        let first = self.timeline.index_of_date(lo).unwrap_or(0);
        let last = self
            .timeline
            .index_of_date(hi)
            .unwrap_or(self.timeline.len() - 1);
        (first <= last).then_some(first..last + 1)
    }

    /// Materialize the current window.
    pub fn render(&self) -> Frame {
        let geo = self.geometry();
        let columns_in_view = self.window.column_range();
        let column_width = self.metrics.column_width;
        let dragged = self.drag.dragged().filter(|_| self.drag.is_dragging()).map(|b| &b.id);

        let columns = columns_in_view
            .clone()
            .filter_map(|i| self.timeline.column(i))
            .collect();

        let rows = self
            .window
            .row_range()
            .map(|index| {
                let row = &self.rows[index];
                let (bookings, selected) = match row {
                    VisibleRow::Parent { .. } => (Vec::new(), None),
                    VisibleRow::Child { id, .. } => {
                        let placed = layout::layout_row(self.bookings_for(id), &self.timeline, &columns_in_view);
                        let views = placed
                            .into_iter()
                            .map(|p| {
                                let display = p.booking.display();
                                BookingView {
                                    dragging: dragged == Some(&p.booking.id),
                                    booking_id: p.booking.id.clone(),
                                    text: p.booking.text.clone(),
                                    left_px: p.placement.left_px(column_width),
                                    width_px: p.placement.width_px(column_width),
                                    placement: p.placement,
                                    back_color: display.back_color().to_string(),
                                    bar_color: display.bar_color().to_string(),
                                }
                            })
                            .collect();
                        (views, self.selected_columns(id))
                    }
                };
                RowView {
                    index,
                    row: row.clone(),
                    top_px: geo.row_top(index),
                    bookings,
                    selected,
                }
            })
            .collect();

        Frame {
            window: self.window,
            columns,
            rows,
            drag_offset: self.drag.is_dragging().then(|| self.drag.offset()),
            drop_target: self.drag.drop_target().cloned(),
            content_size: virtualize::content_size(self.rows.len(), self.timeline.len(), &self.metrics),
        }
    }

    /// One body cell. `None` for group rows and out-of-range indices.
    pub fn cell(&self, row: usize, column: usize) -> Option<CellView> {
        let VisibleRow::Child { id, .. } = self.rows.get(row)? else {
            return None;
        };
        let date = self.timeline.date(column)?;
        let occupant = layout::cell_occupant(self.bookings_for(id), &self.timeline, column)
            .map(|(b, role)| (b.id.clone(), role));
        let selected = self
            .selected_columns(id)
            .is_some_and(|r| r.contains(&column));
        let drop_target = self
            .drag
            .drop_target()
            .is_some_and(|t| &t.resource_id == id && t.date == date);
        Some(CellView {
            resource_id: id.clone(),
            date,
            occupant,
            selected,
            drop_target,
        })
    }

    /// Row index of a visible room.
    pub fn row_of(&self, resource_id: &str) -> Option<usize> {
        hierarchy::row_of_resource(&self.rows, resource_id)
    }
}
