use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::timeline::{day_key, parse_key};

/// Pointer event timestamp in milliseconds. Only differences are meaningful.
pub type Ms = i64;

/// Half-open day interval `[start, end)`; `end` is the checkout day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "DayRange start must be before end");
        Self { start, end }
    }

    /// Occupied nights. Never counts the checkout day.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Last occupied day (the day before checkout).
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.start)
    }

    pub fn overlaps(&self, other: &DayRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }
}

// ── Resources ────────────────────────────────────────────────────

/// Leaf resource (a room). Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A block of rooms. `children` may be absent in input and is then empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub children: Vec<Resource>,
}

impl ResourceGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>, children: Vec<Resource>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            expanded: false,
            children,
        }
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }
}

// ── Bookings ─────────────────────────────────────────────────────

/// Booking id as assigned by the owning application. Integer ids in input are
/// stringified so id search is always a substring match on text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BookingId(pub String);

impl BookingId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BookingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for BookingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => BookingId(s),
            Raw::Int(n) => BookingId(n.to_string()),
        })
    }
}

/// Booking as delivered by the data source. Dates stay as raw day keys so that
/// a malformed key degrades to "not visible" instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub resource_id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub back_color: Option<String>,
    /// Embedded JSON display payload, see [`DisplayMeta`].
    #[serde(default)]
    pub meta: Option<String>,
}

impl Booking {
    pub fn new(
        id: impl Into<BookingId>,
        resource_id: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            start_date: day_key(start),
            end_date: day_key(end),
            text: String::new(),
            notes: String::new(),
            back_color: None,
            meta: None,
        }
    }

    /// Parsed stay. `None` when either key is malformed or `start >= end`.
    pub fn stay(&self) -> Option<DayRange> {
        let start = parse_key(&self.start_date)?;
        let end = parse_key(&self.end_date)?;
        (start < end).then(|| DayRange::new(start, end))
    }

    /// Display metadata, falling back to defaults when the payload is absent
    /// or malformed.
    pub fn display(&self) -> DisplayMeta {
        let mut meta = match self.meta.as_deref() {
            Some(raw) => match serde_json::from_str::<DisplayMeta>(raw) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::debug!("booking {}: bad display payload: {e}", self.id);
                    DisplayMeta::default()
                }
            },
            None => DisplayMeta::default(),
        };
        if meta.back_color.is_none() {
            meta.back_color = self.back_color.clone();
        }
        meta
    }
}

pub const DEFAULT_BACK_COLOR: &str = "#e3f2fd";
pub const DEFAULT_BAR_COLOR: &str = "#1e88e5";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMeta {
    #[serde(default)]
    pub back_color: Option<String>,
    #[serde(default)]
    pub bar_color: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Percent paid, 0..=100.
    #[serde(default)]
    pub paid: Option<u8>,
}

impl DisplayMeta {
    pub fn back_color(&self) -> &str {
        self.back_color.as_deref().unwrap_or(DEFAULT_BACK_COLOR)
    }

    pub fn bar_color(&self) -> &str {
        self.bar_color.as_deref().unwrap_or(DEFAULT_BAR_COLOR)
    }
}

// ── Derived rows ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Parent,
    Child,
}

/// One entry of the flattened row list, shared by the label column and the
/// timeline cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleRow {
    Parent {
        id: String,
        name: String,
        expanded: bool,
    },
    Child {
        id: String,
        name: String,
        parent_id: String,
    },
}

impl VisibleRow {
    pub fn id(&self) -> &str {
        match self {
            VisibleRow::Parent { id, .. } | VisibleRow::Child { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VisibleRow::Parent { name, .. } | VisibleRow::Child { name, .. } => name,
        }
    }

    pub fn kind(&self) -> RowKind {
        match self {
            VisibleRow::Parent { .. } => RowKind::Parent,
            VisibleRow::Child { .. } => RowKind::Child,
        }
    }

    /// Row identity. Group and room ids live in separate namespaces.
    pub fn key(&self) -> (RowKind, &str) {
        (self.kind(), self.id())
    }

    pub fn is_child(&self) -> bool {
        matches!(self, VisibleRow::Child { .. })
    }
}

// ── Gestures and intents ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn delta(&self, origin: &Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Range selection on one room row. `end_date` is the last hovered cell, which
/// becomes the checkout day of the created booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub resource_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Selection {
    /// Swap endpoints if the drag went backward.
    pub fn normalized(mut self) -> Self {
        if self.end_date < self.start_date {
            std::mem::swap(&mut self.start_date, &mut self.end_date);
        }
        self
    }

    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days().abs()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTarget {
    pub date: NaiveDate,
    pub resource_id: String,
}

/// Output of the external booking form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingForm {
    pub text: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntent {
    pub resource_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub text: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub booking_id: BookingId,
    pub resource_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Everything the controller tells the outside world. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Selection gesture finished; the confirmation surface should open.
    SelectionSettled { selection: Selection },
    BookingCreateRequested { intent: CreateIntent },
    BookingMoveRequested { intent: MoveIntent },
    /// Plain click on a booking block.
    BookingOpened { booking_id: BookingId },
    /// A group's `expanded` flag toggled. Carries the full updated tree.
    ResourcesChanged { resources: Vec<ResourceGroup> },
    SnapshotApplied { generation: u64 },
    LoadFailed { generation: u64, message: String },
}

impl Event {
    /// Room the event concerns, for per-resource subscriptions.
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Event::SelectionSettled { selection } => Some(&selection.resource_id),
            Event::BookingCreateRequested { intent } => Some(&intent.resource_id),
            Event::BookingMoveRequested { intent } => Some(&intent.resource_id),
            Event::BookingOpened { .. }
            | Event::ResourcesChanged { .. }
            | Event::SnapshotApplied { .. }
            | Event::LoadFailed { .. } => None,
        }
    }
}

/// Completed data load handed to the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub resources: Vec<ResourceGroup>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}
