use chrono::NaiveDate;

use crate::drag::DragEnd;
use crate::hierarchy;
use crate::limits::*;
use crate::model::*;
use crate::observability::{DRAGS_ABANDONED_TOTAL, MOVES_COALESCED_TOTAL};
use crate::selection::Release;

use super::{geometry, Controller, GridError};

fn record_coalesced(before: u64, after: u64) {
    if after > before {
        metrics::counter!(MOVES_COALESCED_TOTAL).increment(after - before);
    }
}

impl Controller {
    // ── Data ─────────────────────────────────────────────────

    /// Swap in a new booking set, e.g. after the owning application applied
    /// an intent. Resources and expansion state are untouched.
    pub fn replace_bookings(&mut self, bookings: Vec<Booking>) -> Result<(), GridError> {
        if bookings.len() > MAX_BOOKINGS {
            return Err(GridError::LimitExceeded("too many bookings"));
        }
        self.bookings = bookings;
        self.reindex_bookings();
        // The booking-id filter depends on bookings.
        if !self.filters.booking_id.trim().is_empty() {
            self.refresh_rows();
        }
        self.drop_orphaned_gestures();
        Ok(())
    }

    // ── Hierarchy ────────────────────────────────────────────

    /// Flip a group's expanded flag and emit the full updated tree.
    pub fn toggle_group(&mut self, group_id: &str) -> Result<Event, GridError> {
        let expanded = hierarchy::toggle(&mut self.resources, group_id)
            .ok_or_else(|| GridError::UnknownGroup(group_id.to_string()))?;
        tracing::info!("group {group_id} {}", if expanded { "expanded" } else { "collapsed" });
        self.refresh_rows();
        self.drop_orphaned_gestures();
        Ok(self.emit(Event::ResourcesChanged {
            resources: self.resources.clone(),
        }))
    }

    pub fn set_all_expanded(&mut self, expanded: bool) -> Event {
        hierarchy::set_all_expanded(&mut self.resources, expanded);
        self.refresh_rows();
        self.drop_orphaned_gestures();
        self.emit(Event::ResourcesChanged {
            resources: self.resources.clone(),
        })
    }

    // ── Filters ──────────────────────────────────────────────

    pub fn set_search(&mut self, term: &str) -> Result<(), GridError> {
        if term.len() > MAX_FILTER_LEN {
            return Err(GridError::LimitExceeded("search term too long"));
        }
        if self.filters.search == term {
            return Ok(());
        }
        self.filters.search = term.to_string();
        tracing::debug!("search filter set to {term:?}");
        self.refilter();
        Ok(())
    }

    pub fn set_booking_filter(&mut self, needle: &str) -> Result<(), GridError> {
        if needle.len() > MAX_FILTER_LEN {
            return Err(GridError::LimitExceeded("booking filter too long"));
        }
        if self.filters.booking_id == needle {
            return Ok(());
        }
        self.filters.booking_id = needle.to_string();
        tracing::debug!("booking filter set to {needle:?}");
        self.refilter();
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        if self.filters.search.is_empty() && self.filters.booking_id.is_empty() {
            return;
        }
        self.filters.clear();
        tracing::debug!("filters cleared");
        self.refilter();
    }

    fn refilter(&mut self) {
        metrics::counter!(crate::observability::RECOMPUTE_TOTAL, "stage" => "filter").increment(1);
        self.refresh_rows();
        self.drop_orphaned_gestures();
    }

    // ── Viewport ─────────────────────────────────────────────

    pub fn scroll_to(&mut self, scroll_x: f64, scroll_y: f64) {
        self.viewport.scroll_x = scroll_x;
        self.viewport.scroll_y = scroll_y;
        self.refresh_window();
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll_to(self.viewport.scroll_x + dx, self.viewport.scroll_y + dy);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width.max(0.0);
        self.viewport.height = height.max(0.0);
        self.refresh_window();
    }

    // ── Range selection ──────────────────────────────────────

    fn check_cell(&self, resource_id: &str, date: NaiveDate) -> Result<(), GridError> {
        if hierarchy::row_of_resource(&self.rows, resource_id).is_none() {
            return Err(GridError::UnknownResource(resource_id.to_string()));
        }
        if !self.timeline.contains(date) {
            return Err(GridError::DateOutOfView(date));
        }
        Ok(())
    }

    /// Pointer down on an empty date cell. Clears any booking gesture. Returns
    /// whether a selection started (it does not while a confirmation is open).
    pub fn cell_down(&mut self, resource_id: &str, date: NaiveDate) -> Result<bool, GridError> {
        self.check_cell(resource_id, date)?;
        if self.drag.cancel() {
            tracing::debug!("booking gesture cleared by range selection");
        }
        Ok(self.selection.pointer_down(date, resource_id))
    }

    /// Pointer entered a date cell. While a booking is being dragged this
    /// updates the drop target; otherwise it extends the selection.
    pub fn cell_enter(&mut self, at: Ms, resource_id: &str, date: NaiveDate) -> Result<bool, GridError> {
        self.check_cell(resource_id, date)?;
        if self.drag.is_dragging() {
            return Ok(self.drag.pointer_enter(DropTarget {
                date,
                resource_id: resource_id.to_string(),
            }));
        }
        if !self.drag.is_idle() {
            return Ok(false);
        }
        let before = self.selection.superseded_moves();
        let changed = self.selection.pointer_enter(at, date, resource_id);
        record_coalesced(before, self.selection.superseded_moves());
        Ok(changed)
    }

    /// Pointer released over the grid. Settles a selection in progress.
    pub fn pointer_up(&mut self) -> Option<Event> {
        match self.selection.pointer_up() {
            Release::Ignored => None,
            Release::Discarded => {
                tracing::debug!("selection below minimum stay discarded");
                None
            }
            Release::Settled(selection) => {
                tracing::info!(
                    "selection settled: {} {}..{}",
                    selection.resource_id,
                    selection.start_date,
                    selection.end_date
                );
                Some(self.emit(Event::SelectionSettled { selection }))
            }
        }
    }

    /// Confirmation surface submitted. `None` unless a selection was pending.
    pub fn confirm(&mut self, form: BookingForm) -> Option<Event> {
        let intent = self.selection.confirm(form)?;
        tracing::info!(
            "create requested on {} {}..{}",
            intent.resource_id,
            intent.start_date,
            intent.end_date
        );
        Some(self.emit(Event::BookingCreateRequested { intent }))
    }

    /// Escape: drop any selection or drag. Nothing is emitted.
    pub fn cancel(&mut self) -> bool {
        let selection = self.selection.cancel();
        let drag = self.drag.cancel();
        selection || drag
    }

    // ── Booking drag ─────────────────────────────────────────

    /// Pointer down on a booking block. Clears any range selection.
    pub fn booking_down(&mut self, booking_id: &BookingId, at: Point, time: Ms) -> Result<(), GridError> {
        let booking = self
            .bookings
            .iter()
            .find(|b| &b.id == booking_id)
            .ok_or_else(|| GridError::UnknownBooking(booking_id.clone()))?;
        if self.selection.cancel() {
            tracing::debug!("range selection cleared by booking gesture");
        }
        self.drag.press(booking, at, time);
        Ok(())
    }

    /// Raw pointer move in viewport coordinates.
    pub fn pointer_move(&mut self, at: Point, time: Ms) -> bool {
        let hit = geometry(&self.metrics, &self.viewport, &self.rows, &self.timeline);
        let was_dragging = self.drag.is_dragging();
        let before = self.drag.superseded_moves();
        let changed = self.drag.pointer_move(at, time, &hit);
        record_coalesced(before, self.drag.superseded_moves());
        if !was_dragging
            && self.drag.is_dragging()
            && let Some(booking) = self.drag.dragged()
        {
            tracing::debug!("drag of {} started", booking.id);
        }
        changed
    }

    /// Frame tick: applies coalesced moves and hold promotion.
    pub fn tick(&mut self, time: Ms) -> bool {
        let hit = geometry(&self.metrics, &self.viewport, &self.rows, &self.timeline);
        let selection = self.selection.tick(time);
        let drag = self.drag.tick(time, &hit);
        selection || drag
    }

    /// Pointer released after pressing a booking.
    pub fn release(&mut self, at: Point, time: Ms) -> Option<Event> {
        let hit = geometry(&self.metrics, &self.viewport, &self.rows, &self.timeline);
        match self.drag.release(at, time, &hit) {
            DragEnd::Ignored => None,
            DragEnd::Click(booking_id) => Some(self.emit(Event::BookingOpened { booking_id })),
            DragEnd::Moved(intent) => {
                tracing::info!(
                    "move requested: {} -> {} {}..{}",
                    intent.booking_id,
                    intent.resource_id,
                    intent.start_date,
                    intent.end_date
                );
                Some(self.emit(Event::BookingMoveRequested { intent }))
            }
            DragEnd::Abandoned(booking_id) => {
                tracing::debug!("drag of {booking_id} abandoned: no drop target");
                metrics::counter!(DRAGS_ABANDONED_TOTAL).increment(1);
                None
            }
        }
    }
}
