use std::ops::Range;

use crate::model::{Booking, DayRange};
use crate::timeline::Timeline;

/// Column span of a booking clipped to the visible date window.
/// `last_column` is inclusive and is the last *occupied* day, never checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub first_column: usize,
    pub last_column: usize,
    /// Booking starts before the window.
    pub clipped_start: bool,
    /// Booking continues past the window.
    pub clipped_end: bool,
}

/// How a single grid cell relates to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    Outside,
    Start,
    Middle,
    End,
    /// One-night stay, or a stay clipped down to a single visible day whose
    /// both ends are real.
    Single,
}

impl Placement {
    pub fn span(&self) -> usize {
        self.last_column - self.first_column + 1
    }

    pub fn left_px(&self, column_width: f64) -> f64 {
        self.first_column as f64 * column_width
    }

    pub fn width_px(&self, column_width: f64) -> f64 {
        self.span() as f64 * column_width
    }

    pub fn covers(&self, column: usize) -> bool {
        self.first_column <= column && column <= self.last_column
    }

    pub fn intersects(&self, columns: &Range<usize>) -> bool {
        self.first_column < columns.end && columns.start <= self.last_column
    }

    /// Cell view of the same placement. Clipped edges are not real starts/ends.
    pub fn cell_role(&self, column: usize) -> CellRole {
        if !self.covers(column) {
            return CellRole::Outside;
        }
        let opens = column == self.first_column && !self.clipped_start;
        let closes = column == self.last_column && !self.clipped_end;
        match (opens, closes) {
            (true, true) => CellRole::Single,
            (true, false) => CellRole::Start,
            (false, true) => CellRole::End,
            (false, false) => CellRole::Middle,
        }
    }
}

/// Place a stay on the timeline.
///
/// Visible when the first night or the last night falls in the window, or the
/// stay covers the window entirely. Clipped to `[0, len-1]`.
pub fn place(stay: &DayRange, timeline: &Timeline) -> Option<Placement> {
    let (window_first, window_last) = (timeline.first()?, timeline.last()?);
    let last_column = timeline.len() - 1;

    let display_end = stay.last_day();
    let start_idx = timeline.index_of_date(stay.start);
    let end_idx = timeline.index_of_date(display_end);
    let spans_window = stay.start < window_first && display_end > window_last;

    if start_idx.is_none() && end_idx.is_none() && !spans_window {
        return None;
    }

    let first_column = start_idx.unwrap_or(0);
    let last = end_idx.unwrap_or(last_column).min(last_column);
    if last < first_column {
        return None;
    }

    Some(Placement {
        first_column,
        last_column: last,
        clipped_start: start_idx.is_none(),
        clipped_end: end_idx.is_none(),
    })
}

/// Place a booking from its raw day keys. Malformed keys, an inverted range,
/// or a stay outside the window all give `None`.
pub fn place_booking(booking: &Booking, timeline: &Timeline) -> Option<Placement> {
    place(&booking.stay()?, timeline)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBooking<'a> {
    pub booking: &'a Booking,
    pub placement: Placement,
}

/// Row rendering path: placements of one room's bookings that intersect the
/// materialized column range, in input order.
pub fn layout_row<'a, I>(bookings: I, timeline: &Timeline, columns: &Range<usize>) -> Vec<PlacedBooking<'a>>
where
    I: IntoIterator<Item = &'a Booking>,
{
    bookings
        .into_iter()
        .filter_map(|b| {
            let placement = place_booking(b, timeline)?;
            placement
                .intersects(columns)
                .then_some(PlacedBooking { booking: b, placement })
        })
        .collect()
}

/// Cell rendering path: the first booking occupying `column`, with its role.
pub fn cell_occupant<'a, I>(bookings: I, timeline: &Timeline, column: usize) -> Option<(&'a Booking, CellRole)>
where
    I: IntoIterator<Item = &'a Booking>,
{
    bookings.into_iter().find_map(|b| {
        let role = place_booking(b, timeline)?.cell_role(column);
        (role != CellRole::Outside).then_some((b, role))
    })
}
