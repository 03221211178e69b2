use std::net::SocketAddr;

use crate::script::Command;

// ── Interaction metrics ─────────────────────────────────────────

/// Counter: intents and signals emitted. Labels: kind.
pub const EVENTS_TOTAL: &str = "roomgrid_events_total";

/// Counter: pointer moves superseded before being applied.
pub const MOVES_COALESCED_TOTAL: &str = "roomgrid_moves_coalesced_total";

/// Counter: drags that ended without a drop target.
pub const DRAGS_ABANDONED_TOTAL: &str = "roomgrid_drags_abandoned_total";

// ── Derived-state metrics ───────────────────────────────────────

/// Counter: derived recomputations. Labels: stage (filter, flatten, window).
pub const RECOMPUTE_TOTAL: &str = "roomgrid_recompute_total";

/// Gauge: rows in the current flattened list.
pub const VISIBLE_ROWS: &str = "roomgrid_visible_rows";

/// Gauge: body cells in the current materialization window.
pub const WINDOW_CELLS: &str = "roomgrid_window_cells";

// ── Data loading ────────────────────────────────────────────────

/// Counter: finished loads. Labels: status (applied, discarded, failed).
pub const LOADS_TOTAL: &str = "roomgrid_loads_total";

/// Histogram: fetch duration in seconds.
pub const LOAD_DURATION_SECONDS: &str = "roomgrid_load_duration_seconds";

/// Counter: driver commands executed. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "roomgrid_commands_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::warn!("metrics exporter not installed: {e}"),
    }
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::Scroll { .. } => "scroll",
        Command::Resize { .. } => "resize",
        Command::Toggle { .. } => "toggle",
        Command::Search { .. } => "search",
        Command::BookingFilter { .. } => "booking_filter",
        Command::Down { .. } => "down",
        Command::Enter { .. } => "enter",
        Command::Up => "up",
        Command::Confirm { .. } => "confirm",
        Command::Cancel => "cancel",
        Command::Grab { .. } => "grab",
        Command::Move { .. } => "move",
        Command::Release { .. } => "release",
        Command::Tick { .. } => "tick",
        Command::Render => "render",
        Command::Reload => "reload",
    }
}
