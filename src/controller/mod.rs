mod error;
mod mutations;
mod queries;

pub use error::GridError;
pub use queries::{BookingView, CellView, Frame, RowView};

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::GridConfig;
use crate::drag::DragMachine;
use crate::filter::{self, FilterState};
use crate::hierarchy;
use crate::limits::*;
use crate::loader::{self, DataSource, LoadError, LoadTicket, Loader};
use crate::model::*;
use crate::notify::NotifyHub;
use crate::selection::SelectionMachine;
use crate::timeline::Timeline;
use crate::virtualize::{self, GridGeometry, GridMetrics, Viewport, VirtualWindow};

/// Outcome of handing a finished load to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Applied,
    /// Stale ticket; result dropped untouched.
    Discarded,
    /// Load failed; previous state kept.
    Failed(String),
}

/// Single owner of grid state. Every transition runs synchronously inside
/// one call; derived state (filtered tree, rows, window, booking index) is
/// recomputed downstream-first whenever an input changes.
pub struct Controller {
    config: GridConfig,
    timeline: Timeline,
    metrics: GridMetrics,
    viewport: Viewport,

    resources: Vec<ResourceGroup>,
    bookings: Vec<Booking>,
    filters: FilterState,

    // ── derived ──
    filtered: Vec<ResourceGroup>,
    rows: Vec<VisibleRow>,
    window: VirtualWindow,
    /// Room id → indices into `bookings`.
    by_resource: HashMap<String, Vec<usize>>,

    selection: SelectionMachine,
    drag: DragMachine,

    loader: Loader,
    last_load_error: Option<String>,
    pub notify: Arc<NotifyHub>,
}

/// Geometry over disjoint controller fields, so it can be held while the
/// gesture machines are borrowed mutably.
fn geometry<'a>(
    metrics: &'a GridMetrics,
    viewport: &'a Viewport,
    rows: &'a [VisibleRow],
    timeline: &'a Timeline,
) -> GridGeometry<'a> {
    GridGeometry {
        metrics,
        viewport,
        rows,
        timeline,
    }
}

/// Reject snapshots that exceed hard caps.
fn validate_snapshot(snapshot: &Snapshot) -> Result<(), GridError> {
    if snapshot.resources.len() > MAX_GROUPS {
        return Err(GridError::LimitExceeded("too many groups"));
    }
    let mut total = 0usize;
    for group in &snapshot.resources {
        if group.children.len() > MAX_RESOURCES_PER_GROUP {
            return Err(GridError::LimitExceeded("too many resources in group"));
        }
        if group.name.len() > MAX_NAME_LEN || group.children.iter().any(|c| c.name.len() > MAX_NAME_LEN) {
            return Err(GridError::LimitExceeded("name too long"));
        }
        total += group.children.len();
    }
    if total > MAX_RESOURCES {
        return Err(GridError::LimitExceeded("too many resources"));
    }
    if snapshot.bookings.len() > MAX_BOOKINGS {
        return Err(GridError::LimitExceeded("too many bookings"));
    }
    Ok(())
}

impl Controller {
    pub fn new(config: GridConfig, notify: Arc<NotifyHub>) -> Result<Self, GridError> {
        config.validate()?;
        let selection = SelectionMachine::new(config.move_interval_ms, config.min_selection_nights);
        let drag = DragMachine::new(config.drag_thresholds(), config.move_interval_ms);
        let mut controller = Self {
            timeline: config.timeline(),
            metrics: config.metrics(),
            viewport: Viewport::default(),
            config,
            resources: Vec::new(),
            bookings: Vec::new(),
            filters: FilterState::default(),
            filtered: Vec::new(),
            rows: Vec::new(),
            window: VirtualWindow::default(),
            by_resource: HashMap::new(),
            selection,
            drag,
            loader: Loader::new(),
            last_load_error: None,
            notify,
        };
        controller.refresh_rows();
        Ok(controller)
    }

    /// Controller already holding a snapshot.
    pub fn with_snapshot(config: GridConfig, snapshot: Snapshot) -> Result<Self, GridError> {
        let mut controller = Self::new(config, Arc::new(NotifyHub::new()))?;
        controller.set_snapshot(snapshot)?;
        Ok(controller)
    }

    /// Replace resources and bookings wholesale.
    pub fn set_snapshot(&mut self, snapshot: Snapshot) -> Result<(), GridError> {
        validate_snapshot(&snapshot)?;
        self.resources = snapshot.resources;
        self.bookings = snapshot.bookings;
        self.reindex_bookings();
        self.refresh_rows();
        self.drop_orphaned_gestures();
        Ok(())
    }

    // ── Loading ──────────────────────────────────────────────

    /// Start a load. Any load still in flight is cancelled and its result
    /// will be discarded.
    pub fn begin_load(&mut self) -> LoadTicket {
        let ticket = self.loader.begin();
        tracing::debug!("load {} started", ticket.generation);
        ticket
    }

    /// Apply a finished load if its ticket is still current. Failures leave
    /// the grid untouched and are surfaced as `LoadFailed`.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Snapshot, LoadError>) -> LoadStatus {
        if !self.loader.is_current(&ticket) {
            tracing::debug!("load {} discarded (stale)", ticket.generation);
            metrics::counter!(crate::observability::LOADS_TOTAL, "status" => "discarded").increment(1);
            return LoadStatus::Discarded;
        }

        let result = result.and_then(|snap| match validate_snapshot(&snap) {
            Ok(()) => Ok(snap),
            Err(e) => Err(LoadError::Rejected(e.to_string())),
        });

        match result {
            Ok(snapshot) => {
                tracing::info!(
                    "load {} applied: {} groups, {} bookings",
                    ticket.generation,
                    snapshot.resources.len(),
                    snapshot.bookings.len()
                );
                self.resources = snapshot.resources;
                self.bookings = snapshot.bookings;
                self.reindex_bookings();
                self.refresh_rows();
                self.drop_orphaned_gestures();
                self.last_load_error = None;
                metrics::counter!(crate::observability::LOADS_TOTAL, "status" => "applied").increment(1);
                self.emit(Event::SnapshotApplied {
                    generation: ticket.generation,
                });
                LoadStatus::Applied
            }
            Err(LoadError::Cancelled) => {
                metrics::counter!(crate::observability::LOADS_TOTAL, "status" => "discarded").increment(1);
                LoadStatus::Discarded
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("load {} failed: {message}", ticket.generation);
                metrics::counter!(crate::observability::LOADS_TOTAL, "status" => "failed").increment(1);
                self.last_load_error = Some(message.clone());
                self.emit(Event::LoadFailed {
                    generation: ticket.generation,
                    message: message.clone(),
                });
                LoadStatus::Failed(message)
            }
        }
    }

    /// Fetch from `source` and apply in one go.
    pub async fn load_from(&mut self, source: &dyn DataSource) -> LoadStatus {
        let ticket = self.begin_load();
        let result = loader::fetch(source, &ticket).await;
        self.finish_load(ticket, result)
    }

    /// Tear-down: cancel in-flight loads and any gesture.
    pub fn shutdown(&mut self) {
        self.loader.cancel();
        self.selection.cancel();
        self.drag.cancel();
    }

    // ── Derived state ────────────────────────────────────────

    /// filter → flatten → window.
    pub(super) fn refresh_rows(&mut self) {
        self.filtered = filter::apply(&self.resources, &self.bookings, &self.filters);
        self.rows = hierarchy::flatten(&self.filtered);
        metrics::counter!(crate::observability::RECOMPUTE_TOTAL, "stage" => "flatten").increment(1);
        metrics::gauge!(crate::observability::VISIBLE_ROWS).set(self.rows.len() as f64);
        self.refresh_window();
    }

    pub(super) fn refresh_window(&mut self) {
        self.viewport = virtualize::clamp_scroll(&self.viewport, self.rows.len(), self.timeline.len(), &self.metrics);
        self.window = virtualize::window(self.rows.len(), self.timeline.len(), &self.metrics, &self.viewport);
        metrics::counter!(crate::observability::RECOMPUTE_TOTAL, "stage" => "window").increment(1);
        metrics::gauge!(crate::observability::WINDOW_CELLS).set(self.window.cell_count() as f64);
    }

    pub(super) fn reindex_bookings(&mut self) {
        self.by_resource.clear();
        for (i, b) in self.bookings.iter().enumerate() {
            self.by_resource.entry(b.resource_id.clone()).or_default().push(i);
        }
    }

    /// After new data: gestures whose room or booking vanished are dropped.
    fn drop_orphaned_gestures(&mut self) {
        if let Some(sel) = self.selection.selection()
            && hierarchy::row_of_resource(&self.rows, &sel.resource_id).is_none()
        {
            tracing::debug!("selection on {} dropped after reload", sel.resource_id);
            self.selection.cancel();
        }
        if let Some(booking) = self.drag.dragged()
            && !self.bookings.iter().any(|b| b.id == booking.id)
        {
            tracing::debug!("drag of {} dropped after reload", booking.id);
            self.drag.cancel();
        }
    }

    pub(super) fn emit(&self, event: Event) -> Event {
        metrics::counter!(crate::observability::EVENTS_TOTAL, "kind" => event_kind(&event)).increment(1);
        self.notify.send(&event);
        event
    }
}

fn event_kind(event: &Event) -> &'static str {
    match event {
        Event::SelectionSettled { .. } => "selection_settled",
        Event::BookingCreateRequested { .. } => "booking_create",
        Event::BookingMoveRequested { .. } => "booking_move",
        Event::BookingOpened { .. } => "booking_opened",
        Event::ResourcesChanged { .. } => "resources_changed",
        Event::SnapshotApplied { .. } => "snapshot_applied",
        Event::LoadFailed { .. } => "load_failed",
    }
}
