use chrono::NaiveDate;

use crate::model::{BookingForm, CreateIntent, Ms, Selection};
use crate::throttle::MoveCoalescer;

/// `Idle → Selecting → PendingConfirm → Idle`; cancel returns to `Idle` from
/// anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Selecting(Selection),
    /// Gesture settled, confirmation surface is open.
    PendingConfirm(Selection),
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// No selection was in progress.
    Ignored,
    /// Selection shorter than the minimum stay; back to idle, nothing to confirm.
    Discarded,
    /// Normalized selection awaiting confirmation.
    Settled(Selection),
}

/// Range selection on a single room row.
#[derive(Debug, Clone)]
pub struct SelectionMachine {
    phase: SelectionPhase,
    moves: MoveCoalescer<NaiveDate>,
    min_nights: i64,
}

impl SelectionMachine {
    pub fn new(move_interval: Ms, min_nights: i64) -> Self {
        Self {
            phase: SelectionPhase::Idle,
            moves: MoveCoalescer::new(move_interval),
            min_nights: min_nights.max(0),
        }
    }

    pub fn phase(&self) -> &SelectionPhase {
        &self.phase
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.phase {
            SelectionPhase::Idle => None,
            SelectionPhase::Selecting(s) | SelectionPhase::PendingConfirm(s) => Some(s),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SelectionPhase::Idle
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.phase, SelectionPhase::Selecting(_))
    }

    pub fn is_pending_confirm(&self) -> bool {
        matches!(self.phase, SelectionPhase::PendingConfirm(_))
    }

    /// Start a selection on an empty cell. Ignored while a confirmation is
    /// open. Returns whether a selection started.
    pub fn pointer_down(&mut self, date: NaiveDate, resource_id: &str) -> bool {
        if self.is_pending_confirm() {
            return false;
        }
        self.moves.reset();
        self.phase = SelectionPhase::Selecting(Selection {
            resource_id: resource_id.to_string(),
            start_date: date,
            end_date: date,
        });
        true
    }

    /// Extend the selection. Other rows are ignored; bursts are coalesced.
    /// Returns whether the visible selection changed.
    pub fn pointer_enter(&mut self, at: Ms, date: NaiveDate, resource_id: &str) -> bool {
        let SelectionPhase::Selecting(sel) = &self.phase else {
            return false;
        };
        if sel.resource_id != resource_id {
            return false;
        }
        match self.moves.offer(at, date) {
            Some(date) => self.extend_to(date),
            None => false,
        }
    }

    /// Frame tick: apply a coalesced move whose slot has come.
    pub fn tick(&mut self, at: Ms) -> bool {
        if !self.is_selecting() {
            return false;
        }
        match self.moves.poll(at) {
            Some(date) => self.extend_to(date),
            None => false,
        }
    }

    /// Finish the gesture. The latest coalesced position is applied first, so
    /// throttling never loses the final cell.
    pub fn pointer_up(&mut self) -> Release {
        if let Some(date) = self.moves.flush() {
            self.extend_to(date);
        }
        let phase = std::mem::replace(&mut self.phase, SelectionPhase::Idle);
        let SelectionPhase::Selecting(sel) = phase else {
            self.phase = phase;
            return Release::Ignored;
        };

        let sel = sel.normalized();
        if sel.nights() < self.min_nights {
            return Release::Discarded;
        }
        self.phase = SelectionPhase::PendingConfirm(sel.clone());
        Release::Settled(sel)
    }

    /// Confirm with the form output. Only valid while a confirmation is open.
    pub fn confirm(&mut self, form: BookingForm) -> Option<CreateIntent> {
        if !self.is_pending_confirm() {
            return None;
        }
        let SelectionPhase::PendingConfirm(sel) = std::mem::replace(&mut self.phase, SelectionPhase::Idle)
        else {
            return None;
        };
        Some(CreateIntent {
            resource_id: sel.resource_id,
            start_date: sel.start_date,
            end_date: sel.end_date,
            text: form.text,
            notes: form.notes,
        })
    }

    /// Drop any selection. Returns whether something was cleared.
    pub fn cancel(&mut self) -> bool {
        self.moves.reset();
        let was_active = !self.is_idle();
        self.phase = SelectionPhase::Idle;
        was_active
    }

    pub fn superseded_moves(&self) -> u64 {
        self.moves.superseded()
    }

    fn extend_to(&mut self, date: NaiveDate) -> bool {
        match &mut self.phase {
            SelectionPhase::Selecting(sel) if sel.end_date != date => {
                sel.end_date = date;
                true
            }
            _ => false,
        }
    }
}
