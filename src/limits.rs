// Hard caps checked when configuration or a data snapshot is applied.

/// Longest date axis a view may show (ten years).
pub const MAX_DAYS: usize = 3_660;

pub const MAX_GROUPS: usize = 10_000;

pub const MAX_RESOURCES_PER_GROUP: usize = 10_000;

/// Total rooms across all groups.
pub const MAX_RESOURCES: usize = 100_000;

pub const MAX_BOOKINGS: usize = 1_000_000;

pub const MAX_NAME_LEN: usize = 256;

pub const MAX_FILTER_LEN: usize = 256;

/// Largest pixel size accepted for rows, columns and pinned bands.
pub const MAX_CELL_PX: f64 = 4_096.0;

pub const MAX_OVERSCAN: usize = 100;
