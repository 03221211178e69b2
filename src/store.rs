use ulid::Ulid;

use crate::limits::MAX_BOOKINGS;
use crate::model::*;
use crate::timeline::day_key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownBooking(BookingId),
    /// Checkout on or before check-in.
    EmptyStay,
    /// Overlaps an existing booking on the same room.
    Conflict(BookingId),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownBooking(id) => write!(f, "unknown booking: {id}"),
            StoreError::EmptyStay => write!(f, "stay must cover at least one night"),
            StoreError::Conflict(id) => write!(f, "conflicts with booking {id}"),
            StoreError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Booking set owned by the application. Applies the controller's intents;
/// the controller itself never mutates bookings.
#[derive(Debug, Clone, Default)]
pub struct BookingStore {
    bookings: Vec<Booking>,
    /// Refuse creates and moves that overlap another stay on the same room.
    reject_overlap: bool,
}

impl BookingStore {
    pub fn new(bookings: Vec<Booking>) -> Self {
        Self {
            bookings,
            reject_overlap: false,
        }
    }

    pub fn reject_overlap(mut self, reject: bool) -> Self {
        self.reject_overlap = reject;
        self
    }

    /// Replace the whole set, e.g. after a reload. The overlap policy stays.
    pub fn reset(&mut self, bookings: Vec<Booking>) {
        self.bookings = bookings;
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn get(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| &b.id == id)
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Append a new booking under a fresh id.
    pub fn create(&mut self, intent: &CreateIntent) -> Result<BookingId, StoreError> {
        if self.bookings.len() >= MAX_BOOKINGS {
            return Err(StoreError::LimitExceeded("too many bookings"));
        }
        if intent.start_date >= intent.end_date {
            return Err(StoreError::EmptyStay);
        }
        let stay = DayRange::new(intent.start_date, intent.end_date);
        self.check_overlap(&intent.resource_id, &stay, None)?;

        let id = BookingId(Ulid::new().to_string());
        self.bookings.push(Booking {
            text: intent.text.clone(),
            notes: intent.notes.clone(),
            ..Booking::new(id.clone(), intent.resource_id.clone(), intent.start_date, intent.end_date)
        });
        tracing::info!("booking {id} created on {}", intent.resource_id);
        Ok(id)
    }

    /// Move a booking in place. All other fields are kept.
    pub fn relocate(&mut self, intent: &MoveIntent) -> Result<(), StoreError> {
        if intent.start_date >= intent.end_date {
            return Err(StoreError::EmptyStay);
        }
        let pos = self
            .bookings
            .iter()
            .position(|b| b.id == intent.booking_id)
            .ok_or_else(|| StoreError::UnknownBooking(intent.booking_id.clone()))?;
        let stay = DayRange::new(intent.start_date, intent.end_date);
        self.check_overlap(&intent.resource_id, &stay, Some(&intent.booking_id))?;

        let booking = &mut self.bookings[pos];
        booking.resource_id = intent.resource_id.clone();
        booking.start_date = day_key(intent.start_date);
        booking.end_date = day_key(intent.end_date);
        tracing::info!("booking {} moved to {}", intent.booking_id, intent.resource_id);
        Ok(())
    }

    /// Apply an intent event. Returns whether the booking set changed; other
    /// events are ignored.
    pub fn apply(&mut self, event: &Event) -> Result<bool, StoreError> {
        match event {
            Event::BookingCreateRequested { intent } => self.create(intent).map(|_| true),
            Event::BookingMoveRequested { intent } => self.relocate(intent).map(|()| true),
            _ => Ok(false),
        }
    }

    /// Half-open on both sides: a checkout day may be the next check-in.
    fn check_overlap(&self, resource_id: &str, stay: &DayRange, skip: Option<&BookingId>) -> Result<(), StoreError> {
        if !self.reject_overlap {
            return Ok(());
        }
        let clash = self
            .bookings
            .iter()
            .filter(|b| b.resource_id == resource_id && Some(&b.id) != skip)
            .find(|b| b.stay().is_some_and(|s| s.overlaps(stay)));
        match clash {
            Some(b) => Err(StoreError::Conflict(b.id.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::parse_key;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        parse_key(s).unwrap()
    }

    fn create(room: &str, start: &str, end: &str) -> CreateIntent {
        CreateIntent {
            resource_id: room.into(),
            start_date: d(start),
            end_date: d(end),
            text: "Smith".into(),
            notes: String::new(),
        }
    }

    fn existing() -> Vec<Booking> {
        vec![Booking::new("1", "R1", d("2024-01-02"), d("2024-01-05"))]
    }

    #[test]
    fn create_assigns_fresh_id() {
        let mut store = BookingStore::new(existing());
        let a = store.create(&create("R2", "2024-01-03", "2024-01-06")).unwrap();
        let b = store.create(&create("R2", "2024-01-10", "2024-01-11")).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 3);
        let created = store.get(&a).unwrap();
        assert_eq!(created.text, "Smith");
        assert_eq!(created.start_date, "2024-01-03");
        assert_eq!(created.end_date, "2024-01-06");
    }

    #[test]
    fn empty_stay_rejected() {
        let mut store = BookingStore::default();
        assert_eq!(
            store.create(&create("R1", "2024-01-03", "2024-01-03")),
            Err(StoreError::EmptyStay)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn overlap_allowed_by_default() {
        let mut store = BookingStore::new(existing());
        store.create(&create("R1", "2024-01-03", "2024-01-04")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn overlap_rejected_when_enabled() {
        let mut store = BookingStore::new(existing()).reject_overlap(true);
        assert_eq!(
            store.create(&create("R1", "2024-01-04", "2024-01-06")),
            Err(StoreError::Conflict(BookingId::from("1")))
        );
        // Check-in on the previous guest's checkout day is fine.
        store.create(&create("R1", "2024-01-05", "2024-01-07")).unwrap();
    }

    #[test]
    fn relocate_keeps_other_fields() {
        let mut store = BookingStore::new(vec![Booking {
            text: "Jones".into(),
            ..Booking::new("7", "R1", d("2024-01-02"), d("2024-01-05"))
        }]);
        store
            .relocate(&MoveIntent {
                booking_id: BookingId::from("7"),
                resource_id: "R2".into(),
                start_date: d("2024-01-10"),
                end_date: d("2024-01-13"),
            })
            .unwrap();
        let moved = store.get(&BookingId::from("7")).unwrap();
        assert_eq!(moved.resource_id, "R2");
        assert_eq!((moved.start_date.as_str(), moved.end_date.as_str()), ("2024-01-10", "2024-01-13"));
        assert_eq!(moved.text, "Jones");
    }

    #[test]
    fn relocate_onto_itself_is_not_a_conflict() {
        let mut store = BookingStore::new(existing()).reject_overlap(true);
        store
            .relocate(&MoveIntent {
                booking_id: BookingId::from("1"),
                resource_id: "R1".into(),
                start_date: d("2024-01-03"),
                end_date: d("2024-01-06"),
            })
            .unwrap();
    }

    #[test]
    fn relocate_unknown_booking() {
        let mut store = BookingStore::default();
        let err = store
            .relocate(&MoveIntent {
                booking_id: BookingId::from("9"),
                resource_id: "R1".into(),
                start_date: d("2024-01-03"),
                end_date: d("2024-01-06"),
            })
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownBooking(BookingId::from("9")));
    }

    #[test]
    fn apply_ignores_signals() {
        let mut store = BookingStore::new(existing());
        let opened = Event::BookingOpened {
            booking_id: BookingId::from("1"),
        };
        assert_eq!(store.apply(&opened), Ok(false));
        let create = Event::BookingCreateRequested {
            intent: create("R1", "2024-01-10", "2024-01-12"),
        };
        assert_eq!(store.apply(&create), Ok(true));
        assert_eq!(store.len(), 2);
    }
}
