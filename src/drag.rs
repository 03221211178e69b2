use chrono::Days;

use crate::model::{Booking, BookingId, DropTarget, MoveIntent, Ms, Point};
use crate::throttle::MoveCoalescer;

/// Anything that can say which cell lies under a pointer position.
pub trait HitTest {
    fn drop_target_at(&self, point: Point) -> Option<DropTarget>;
}

impl<F> HitTest for F
where
    F: Fn(Point) -> Option<DropTarget>,
{
    fn drop_target_at(&self, point: Point) -> Option<DropTarget> {
        self(point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragThresholds {
    /// Movement beyond this many pixels promotes to a drag.
    pub distance_px: f64,
    /// Holding at least this long promotes to a drag.
    pub hold_ms: Ms,
}

impl Default for DragThresholds {
    fn default() -> Self {
        Self {
            distance_px: 5.0,
            hold_ms: 200,
        }
    }
}

/// Where the pointer went down on a booking block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Press {
    pub at: Point,
    pub time: Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Pending,
    Drag,
    Click,
}

/// Click-vs-drag decision from press and current pointer sample alone.
pub fn disambiguate(
    press: &Press,
    current: Point,
    now: Ms,
    released: bool,
    thresholds: &DragThresholds,
) -> Gesture {
    let moved = press.at.distance(&current) > thresholds.distance_px;
    let held = now - press.time >= thresholds.hold_ms;
    if moved || held {
        Gesture::Drag
    } else if released {
        Gesture::Click
    } else {
        Gesture::Pending
    }
}

/// New position of a booking dropped on `target`, duration preserved.
/// `None` when the booking's own dates are unusable.
pub fn relocate(booking: &Booking, target: &DropTarget) -> Option<MoveIntent> {
    let stay = booking.stay()?;
    let end_date = target
        .date
        .checked_add_days(Days::new(stay.nights() as u64))?;
    Some(MoveIntent {
        booking_id: booking.id.clone(),
        resource_id: target.resource_id.clone(),
        start_date: target.date,
        end_date,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragPhase {
    Idle,
    /// Pointer down on a booking, not yet decided.
    Pressed { booking: Booking, press: Press },
    Dragging {
        booking: Booking,
        press: Press,
        /// Cumulative pointer displacement, visual only.
        offset: Point,
        drop_target: Option<DropTarget>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragEnd {
    /// No gesture was in progress.
    Ignored,
    /// Released without crossing a threshold: open the booking.
    Click(BookingId),
    Moved(MoveIntent),
    /// Nothing valid under the pointer. Booking stays where it was.
    Abandoned(BookingId),
}

/// Relocation of an existing booking: `Idle → Pressed → Dragging → Idle`.
#[derive(Debug, Clone)]
pub struct DragMachine {
    phase: DragPhase,
    thresholds: DragThresholds,
    moves: MoveCoalescer<Point>,
}

impl DragMachine {
    pub fn new(thresholds: DragThresholds, move_interval: Ms) -> Self {
        Self {
            phase: DragPhase::Idle,
            thresholds,
            moves: MoveCoalescer::new(move_interval),
        }
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == DragPhase::Idle
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    pub fn dragged(&self) -> Option<&Booking> {
        match &self.phase {
            DragPhase::Idle => None,
            DragPhase::Pressed { booking, .. } | DragPhase::Dragging { booking, .. } => Some(booking),
        }
    }

    pub fn offset(&self) -> Point {
        match &self.phase {
            DragPhase::Dragging { offset, .. } => *offset,
            _ => Point::default(),
        }
    }

    pub fn drop_target(&self) -> Option<&DropTarget> {
        match &self.phase {
            DragPhase::Dragging { drop_target, .. } => drop_target.as_ref(),
            _ => None,
        }
    }

    /// Pointer down on a booking block.
    pub fn press(&mut self, booking: &Booking, at: Point, time: Ms) {
        self.moves.reset();
        self.phase = DragPhase::Pressed {
            booking: booking.clone(),
            press: Press { at, time },
        };
    }

    /// Pointer moved. Returns true when the drag state visibly changed.
    pub fn pointer_move(&mut self, at: Point, time: Ms, hit: &impl HitTest) -> bool {
        match &self.phase {
            DragPhase::Idle => false,
            DragPhase::Pressed { press, .. } => {
                if disambiguate(press, at, time, false, &self.thresholds) == Gesture::Drag {
                    self.promote(at, hit);
                    self.moves.offer(time, at);
                    true
                } else {
                    false
                }
            }
            DragPhase::Dragging { .. } => match self.moves.offer(time, at) {
                Some(p) => self.track(p, hit),
                None => false,
            },
        }
    }

    /// Pointer entered a date cell. While dragging this is drop-target
    /// tracking, never selection.
    pub fn pointer_enter(&mut self, target: DropTarget) -> bool {
        match &mut self.phase {
            DragPhase::Dragging { drop_target, .. } => {
                // The entered cell supersedes any move still waiting.
                self.moves.flush();
                let changed = drop_target.as_ref() != Some(&target);
                *drop_target = Some(target);
                changed
            }
            _ => false,
        }
    }

    /// Frame tick: hold-promotion and coalesced moves.
    pub fn tick(&mut self, time: Ms, hit: &impl HitTest) -> bool {
        match &self.phase {
            DragPhase::Idle => false,
            DragPhase::Pressed { press, .. } => {
                let at = press.at;
                if disambiguate(press, at, time, false, &self.thresholds) == Gesture::Drag {
                    self.promote(at, hit);
                    true
                } else {
                    false
                }
            }
            DragPhase::Dragging { .. } => match self.moves.poll(time) {
                Some(p) => self.track(p, hit),
                None => false,
            },
        }
    }

    /// Pointer released. Falls back to a final lookup at `at` when no target
    /// was resolved during movement.
    pub fn release(&mut self, at: Point, time: Ms, hit: &impl HitTest) -> DragEnd {
        let phase = std::mem::replace(&mut self.phase, DragPhase::Idle);
        let pending = self.moves.flush();
        self.moves.reset();

        match phase {
            DragPhase::Idle => DragEnd::Ignored,
            DragPhase::Pressed { booking, press } => {
                match disambiguate(&press, at, time, true, &self.thresholds) {
                    Gesture::Drag => finish(&booking, hit.drop_target_at(at)),
                    Gesture::Click | Gesture::Pending => DragEnd::Click(booking.id),
                }
            }
            DragPhase::Dragging {
                booking, drop_target, ..
            } => {
                // An unapplied move is the latest position and replaces the
                // stored target, resolved or not.
                let target = match pending {
                    Some(p) => hit.drop_target_at(p),
                    None => drop_target,
                }
                .or_else(|| hit.drop_target_at(at));
                finish(&booking, target)
            }
        }
    }

    /// Abandon any gesture without emitting anything.
    pub fn cancel(&mut self) -> bool {
        self.moves.reset();
        let was_active = !self.is_idle();
        self.phase = DragPhase::Idle;
        was_active
    }

    pub fn superseded_moves(&self) -> u64 {
        self.moves.superseded()
    }

    fn promote(&mut self, at: Point, hit: &impl HitTest) {
        let phase = std::mem::replace(&mut self.phase, DragPhase::Idle);
        if let DragPhase::Pressed { booking, press } = phase {
            self.phase = DragPhase::Dragging {
                booking,
                offset: at.delta(&press.at),
                drop_target: hit.drop_target_at(at),
                press,
            };
        }
    }

    fn track(&mut self, at: Point, hit: &impl HitTest) -> bool {
        match &mut self.phase {
            DragPhase::Dragging {
                press,
                offset,
                drop_target,
                ..
            } => {
                *offset = at.delta(&press.at);
                *drop_target = hit.drop_target_at(at);
                true
            }
            _ => false,
        }
    }
}

fn finish(booking: &Booking, target: Option<DropTarget>) -> DragEnd {
    match target.and_then(|t| relocate(booking, &t)) {
        Some(intent) => DragEnd::Moved(intent),
        None => DragEnd::Abandoned(booking.id.clone()),
    }
}
