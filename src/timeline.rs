use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Day key format used at every boundary: `YYYY-MM-DD`.
pub const KEY_FORMAT: &str = "%Y-%m-%d";

/// Parse a day key. Anything that is not exactly `YYYY-MM-DD` is `None`.
pub fn parse_key(key: &str) -> Option<NaiveDate> {
    if key.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(key, KEY_FORMAT).ok()
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// `count` contiguous days starting at `start` (today when omitted).
pub fn generate_range(count: usize, start: Option<NaiveDate>) -> Vec<NaiveDate> {
    let start = start.unwrap_or_else(today);
    start.iter_days().take(count).collect()
}

/// Column of `key` within an ordered, gap-free date list. Binary search, so
/// O(log n); malformed keys are simply not found.
pub fn index_of(key: &str, dates: &[NaiveDate]) -> Option<usize> {
    let date = parse_key(key)?;
    dates.binary_search(&date).ok()
}

/// Inclusive day count between two dates, order-insensitive. Display only.
pub fn day_count(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().abs() + 1
}

/// Header information for one date column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub index: usize,
    pub date: NaiveDate,
    pub key: String,
    pub weekend: bool,
    pub month_start: bool,
}

/// The visible date axis: `len` contiguous days from `start`. Immutable for
/// the lifetime of a view configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    start: NaiveDate,
    len: usize,
}

impl Timeline {
    pub fn new(start: NaiveDate, len: usize) -> Self {
        Self { start, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.date(0)
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.len.checked_sub(1).and_then(|i| self.date(i))
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        if index >= self.len {
            return None;
        }
        self.start.checked_add_days(Days::new(index as u64))
    }

    pub fn key(&self, index: usize) -> Option<String> {
        self.date(index).map(day_key)
    }

    /// O(1): the axis is contiguous, so the column is the day offset.
    pub fn index_of_date(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        if offset < 0 {
            return None;
        }
        let offset = offset as usize;
        (offset < self.len).then_some(offset)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index_of_date(parse_key(key)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.index_of_date(date).is_some()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.len)
    }

    pub fn column(&self, index: usize) -> Option<Column> {
        let date = self.date(index)?;
        Some(Column {
            index,
            date,
            key: day_key(date),
            weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            month_start: date.day() == 1,
        })
    }
}
