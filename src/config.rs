use chrono::NaiveDate;
use serde::Deserialize;

use crate::controller::GridError;
use crate::drag::DragThresholds;
use crate::limits::*;
use crate::model::Ms;
use crate::timeline::{Timeline, parse_key, today};
use crate::virtualize::GridMetrics;

/// View configuration. Every field has a default, so a partial JSON object
/// or an empty environment both work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Number of date columns.
    pub days: usize,
    /// First date column. Today when absent.
    pub start_date: Option<NaiveDate>,
    pub column_width: f64,
    pub row_height: f64,
    /// Width of the pinned room label column.
    pub fixed_column_width: f64,
    /// Height of the pinned date header.
    pub header_height: f64,
    pub overscan_rows: usize,
    pub overscan_columns: usize,
    /// Pointer travel that turns a press on a booking into a drag.
    pub drag_distance_px: f64,
    /// Press duration that turns a press on a booking into a drag.
    pub drag_hold_ms: Ms,
    /// Pointer-move cadence; 16ms is roughly 60 updates per second.
    pub move_interval_ms: Ms,
    /// Shortest stay a range selection may produce. 0 allows same-day.
    pub min_selection_nights: i64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            days: 30,
            start_date: None,
            column_width: 40.0,
            row_height: 50.0,
            fixed_column_width: 150.0,
            header_height: 50.0,
            overscan_rows: 3,
            overscan_columns: 2,
            drag_distance_px: 5.0,
            drag_hold_ms: 200,
            move_interval_ms: 16,
            min_selection_nights: 1,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl GridConfig {
    /// Read `ROOMGRID_*` variables, falling back to defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            days: env_or("ROOMGRID_DAYS", d.days),
            start_date: std::env::var("ROOMGRID_START_DATE")
                .ok()
                .and_then(|s| parse_key(s.trim())),
            column_width: env_or("ROOMGRID_COLUMN_WIDTH", d.column_width),
            row_height: env_or("ROOMGRID_ROW_HEIGHT", d.row_height),
            fixed_column_width: env_or("ROOMGRID_FIXED_COLUMN_WIDTH", d.fixed_column_width),
            header_height: env_or("ROOMGRID_HEADER_HEIGHT", d.header_height),
            overscan_rows: env_or("ROOMGRID_OVERSCAN_ROWS", d.overscan_rows),
            overscan_columns: env_or("ROOMGRID_OVERSCAN_COLUMNS", d.overscan_columns),
            drag_distance_px: env_or("ROOMGRID_DRAG_DISTANCE_PX", d.drag_distance_px),
            drag_hold_ms: env_or("ROOMGRID_DRAG_HOLD_MS", d.drag_hold_ms),
            move_interval_ms: env_or("ROOMGRID_MOVE_INTERVAL_MS", d.move_interval_ms),
            min_selection_nights: env_or("ROOMGRID_MIN_SELECTION_NIGHTS", d.min_selection_nights),
        }
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if self.days > MAX_DAYS {
            return Err(GridError::LimitExceeded("too many days"));
        }
        for (name, px) in [
            ("columnWidth", self.column_width),
            ("rowHeight", self.row_height),
        ] {
            if !(px > 0.0 && px <= MAX_CELL_PX) {
                return Err(GridError::InvalidConfig(name));
            }
        }
        for (name, px) in [
            ("fixedColumnWidth", self.fixed_column_width),
            ("headerHeight", self.header_height),
        ] {
            if !(px >= 0.0 && px <= MAX_CELL_PX) {
                return Err(GridError::InvalidConfig(name));
            }
        }
        if self.overscan_rows > MAX_OVERSCAN || self.overscan_columns > MAX_OVERSCAN {
            return Err(GridError::LimitExceeded("overscan too large"));
        }
        if self.drag_distance_px < 0.0 || self.drag_hold_ms < 0 || self.move_interval_ms < 0 {
            return Err(GridError::InvalidConfig("interaction thresholds"));
        }
        if self.min_selection_nights < 0 {
            return Err(GridError::InvalidConfig("minSelectionNights"));
        }
        Ok(())
    }

    pub fn timeline(&self) -> Timeline {
        Timeline::new(self.start_date.unwrap_or_else(today), self.days)
    }

    pub fn metrics(&self) -> GridMetrics {
        GridMetrics {
            row_height: self.row_height,
            column_width: self.column_width,
            header_height: self.header_height,
            fixed_column_width: self.fixed_column_width,
            overscan_rows: self.overscan_rows,
            overscan_columns: self.overscan_columns,
        }
    }

    pub fn drag_thresholds(&self) -> DragThresholds {
        DragThresholds {
            distance_px: self.drag_distance_px,
            hold_ms: self.drag_hold_ms,
        }
    }
}
