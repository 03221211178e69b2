use chrono::NaiveDate;

use crate::model::BookingId;

#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    UnknownGroup(String),
    /// Not a visible room row.
    UnknownResource(String),
    UnknownBooking(BookingId),
    /// Date outside the visible axis.
    DateOutOfView(NaiveDate),
    InvalidConfig(&'static str),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::UnknownGroup(id) => write!(f, "unknown group: {id}"),
            GridError::UnknownResource(id) => write!(f, "unknown or hidden resource: {id}"),
            GridError::UnknownBooking(id) => write!(f, "unknown booking: {id}"),
            GridError::DateOutOfView(date) => write!(f, "date not in view: {date}"),
            GridError::InvalidConfig(field) => write!(f, "invalid config: {field}"),
            GridError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}
