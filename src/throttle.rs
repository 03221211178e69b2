use crate::model::Ms;

/// Coalesces high-frequency pointer moves to a fixed cadence.
///
/// A move is applied immediately if at least `interval` has passed since the
/// last applied one; otherwise it replaces the pending value. The pending
/// value is never lost: [`MoveCoalescer::flush`] hands it over at pointer-up
/// and [`MoveCoalescer::poll`] releases it on the next frame tick.
#[derive(Debug, Clone)]
pub struct MoveCoalescer<T> {
    interval: Ms,
    last_applied: Option<Ms>,
    pending: Option<T>,
    /// Moves superseded before they were applied.
    superseded: u64,
}

impl<T> MoveCoalescer<T> {
    pub fn new(interval: Ms) -> Self {
        Self {
            interval: interval.max(0),
            last_applied: None,
            pending: None,
            superseded: 0,
        }
    }

    /// Feed a move. Returns the value to apply now, if the cadence allows.
    pub fn offer(&mut self, at: Ms, value: T) -> Option<T> {
        if self.due(at) {
            self.last_applied = Some(at);
            self.pending = None;
            return Some(value);
        }
        if self.pending.replace(value).is_some() {
            self.superseded += 1;
        }
        None
    }

    /// Frame tick: release the pending move if its slot has come.
    pub fn poll(&mut self, at: Ms) -> Option<T> {
        if self.pending.is_some() && self.due(at) {
            self.last_applied = Some(at);
            return self.pending.take();
        }
        None
    }

    /// Take the latest unapplied move regardless of cadence.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Forget everything; the next offer applies immediately.
    pub fn reset(&mut self) {
        self.last_applied = None;
        self.pending = None;
    }

    fn due(&self, at: Ms) -> bool {
        match self.last_applied {
            None => true,
            Some(last) => at - last >= self.interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_move_applies_immediately() {
        let mut c = MoveCoalescer::new(16);
        assert_eq!(c.offer(1000, 'a'), Some('a'));
    }

    #[test]
    fn burst_keeps_only_latest() {
        let mut c = MoveCoalescer::new(16);
        assert_eq!(c.offer(0, 1), Some(1));
        assert_eq!(c.offer(4, 2), None);
        assert_eq!(c.offer(8, 3), None);
        assert_eq!(c.offer(12, 4), None);
        assert_eq!(c.superseded(), 2);
        assert_eq!(c.flush(), Some(4));
        assert_eq!(c.flush(), None);
    }

    #[test]
    fn cadence_reopens_after_interval() {
        let mut c = MoveCoalescer::new(16);
        assert_eq!(c.offer(0, 1), Some(1));
        assert_eq!(c.offer(10, 2), None);
        assert_eq!(c.offer(16, 3), Some(3));
        assert!(!c.has_pending()); // applied value supersedes the pending one
    }

    #[test]
    fn poll_releases_pending_on_tick() {
        let mut c = MoveCoalescer::new(16);
        c.offer(0, 1);
        c.offer(5, 2);
        assert_eq!(c.poll(10), None);
        assert_eq!(c.poll(17), Some(2));
        assert_eq!(c.poll(40), None);
    }

    #[test]
    fn zero_interval_never_coalesces() {
        let mut c = MoveCoalescer::new(0);
        assert_eq!(c.offer(0, 1), Some(1));
        assert_eq!(c.offer(0, 2), Some(2));
    }

    #[test]
    fn reset_clears_cadence() {
        let mut c = MoveCoalescer::new(16);
        c.offer(0, 1);
        c.offer(3, 2);
        c.reset();
        assert!(!c.has_pending());
        assert_eq!(c.offer(4, 3), Some(3));
    }
}
