use std::sync::Arc;

use chrono::Datelike;
use tokio::io::AsyncReadExt;
use tracing::info;

use roomgrid::config::GridConfig;
use roomgrid::controller::{Controller, Frame, GridError, LoadStatus, RowView};
use roomgrid::layout::CellRole;
use roomgrid::loader::{self, DataSource, JsonFileSource, StaticSource};
use roomgrid::model::{Event, Snapshot, VisibleRow};
use roomgrid::notify::NotifyHub;
use roomgrid::observability::{self, COMMANDS_TOTAL};
use roomgrid::script::{self, Command, ScriptError};
use roomgrid::store::BookingStore;

const LABEL_WIDTH: usize = 14;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("ROOMGRID_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    observability::init(metrics_port);

    let config = GridConfig::from_env();
    let width: f64 = std::env::var("ROOMGRID_VIEWPORT_WIDTH")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1280.0);
    let height: f64 = std::env::var("ROOMGRID_VIEWPORT_HEIGHT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(720.0);
    let reject_overlap = std::env::var("ROOMGRID_REJECT_OVERLAP")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(false);
    let data = std::env::var("ROOMGRID_DATA").ok();
    let script_path = std::env::var("ROOMGRID_SCRIPT").ok();

    info!("roomgrid starting");
    info!("  days: {} from {:?}", config.days, config.start_date);
    info!("  viewport: {width}x{height}");
    info!("  data: {}", data.as_deref().unwrap_or("(none)"));
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let source: Arc<dyn DataSource> = match &data {
        Some(path) => Arc::new(JsonFileSource::new(path)),
        None => Arc::new(StaticSource(Snapshot::default())),
    };

    let notify = Arc::new(NotifyHub::new());
    let mut controller = Controller::new(config, notify)?;
    controller.resize(width, height);
    reload(&mut controller, &source).await?;
    let mut store = BookingStore::new(controller.bookings().to_vec()).reject_overlap(reject_overlap);

    let text = match &script_path {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    for (n, line) in text.lines().enumerate() {
        let cmd = match script::parse_command(line) {
            Ok(cmd) => cmd,
            Err(ScriptError::Empty) => continue,
            Err(e) => {
                tracing::warn!("line {}: {e}", n + 1);
                metrics::counter!(COMMANDS_TOTAL, "command" => "invalid", "status" => "error").increment(1);
                continue;
            }
        };
        let label = observability::command_label(&cmd);
        match execute(&mut controller, &mut store, &source, &cmd).await {
            Ok(()) => {
                metrics::counter!(COMMANDS_TOTAL, "command" => label, "status" => "ok").increment(1);
            }
            Err(e) => {
                tracing::warn!("line {}: {label}: {e}", n + 1);
                metrics::counter!(COMMANDS_TOTAL, "command" => label, "status" => "error").increment(1);
            }
        }
    }

    controller.shutdown();
    info!("roomgrid stopped");
    Ok(())
}

async fn reload(controller: &mut Controller, source: &Arc<dyn DataSource>) -> Result<LoadStatus, tokio::task::JoinError> {
    let ticket = controller.begin_load();
    let (ticket, result) = loader::spawn_fetch(source.clone(), ticket).await?;
    let status = controller.finish_load(ticket, result);
    match &status {
        LoadStatus::Applied => info!(
            "loaded {} groups, {} bookings",
            controller.resources().len(),
            controller.bookings().len()
        ),
        LoadStatus::Discarded => info!("load discarded"),
        LoadStatus::Failed(e) => tracing::error!("load failed: {e}"),
    }
    Ok(status)
}

async fn execute(
    controller: &mut Controller,
    store: &mut BookingStore,
    source: &Arc<dyn DataSource>,
    cmd: &Command,
) -> Result<(), GridError> {
    let event = match cmd {
        Command::Scroll { x, y } => {
            controller.scroll_to(*x, *y);
            None
        }
        Command::Resize { width, height } => {
            controller.resize(*width, *height);
            None
        }
        Command::Toggle { group_id } => Some(controller.toggle_group(group_id)?),
        Command::Search { term } => {
            controller.set_search(term)?;
            None
        }
        Command::BookingFilter { needle } => {
            controller.set_booking_filter(needle)?;
            None
        }
        Command::Down { resource_id, date } => {
            controller.cell_down(resource_id, *date)?;
            None
        }
        Command::Enter { at, resource_id, date } => {
            controller.cell_enter(*at, resource_id, *date)?;
            None
        }
        Command::Up => controller.pointer_up(),
        Command::Confirm { form } => controller.confirm(form.clone()),
        Command::Cancel => {
            controller.cancel();
            None
        }
        Command::Grab { booking_id, at, time } => {
            controller.booking_down(booking_id, *at, *time)?;
            None
        }
        Command::Move { at, time } => {
            controller.pointer_move(*at, *time);
            None
        }
        Command::Release { at, time } => controller.release(*at, *time),
        Command::Tick { time } => {
            controller.tick(*time);
            None
        }
        Command::Render => {
            print_frame(&controller.render());
            None
        }
        Command::Reload => {
            match reload(controller, source).await {
                Ok(LoadStatus::Applied) => store.reset(controller.bookings().to_vec()),
                Ok(_) => {}
                Err(e) => tracing::error!("load task failed: {e}"),
            }
            None
        }
    };

    if let Some(event) = event {
        match serde_json::to_string(&event) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!("event not printable: {e}"),
        }
        apply_intent(controller, store, &event)?;
    }
    Ok(())
}

/// Play the owning application: apply intents, feed the result back.
fn apply_intent(controller: &mut Controller, store: &mut BookingStore, event: &Event) -> Result<(), GridError> {
    match store.apply(event) {
        Ok(true) => controller.replace_bookings(store.bookings().to_vec()),
        Ok(false) => Ok(()),
        Err(e) => {
            tracing::warn!("intent rejected: {e}");
            Ok(())
        }
    }
}

fn print_frame(frame: &Frame) {
    if frame.columns.is_empty() || frame.rows.is_empty() {
        println!("(empty grid)");
        return;
    }
    let mut header = " ".repeat(LABEL_WIDTH);
    for column in &frame.columns {
        header.push_str(&format!("{:>3}", column.date.day()));
    }
    println!("{header}");

    for row in &frame.rows {
        let label = match &row.row {
            VisibleRow::Parent { name, expanded, .. } => {
                format!("{} {name}", if *expanded { "v" } else { ">" })
            }
            VisibleRow::Child { name, .. } => format!("  {name}"),
        };
        let mut line: String = label.chars().take(LABEL_WIDTH - 1).collect();
        while line.chars().count() < LABEL_WIDTH {
            line.push(' ');
        }
        if row.row.is_child() {
            for column in &frame.columns {
                line.push_str(&format!("{:>3}", glyph(frame, row, column.index, column.date)));
            }
            for b in &row.bookings {
                line.push_str(&format!("  {}({})", b.text, b.booking_id));
            }
        }
        println!("{line}");
    }
}

fn glyph(frame: &Frame, row: &RowView, column: usize, date: chrono::NaiveDate) -> char {
    if frame
        .drop_target
        .as_ref()
        .is_some_and(|t| t.resource_id == row.row.id() && t.date == date)
    {
        return '+';
    }
    if row.selected.as_ref().is_some_and(|r| r.contains(&column)) {
        return '*';
    }
    let role = row.bookings.iter().find_map(|b| {
        let role = b.placement.cell_role(column);
        (role != CellRole::Outside).then_some(role)
    });
    match role {
        Some(CellRole::Start) => '[',
        Some(CellRole::Middle) => '=',
        Some(CellRole::End) => ']',
        Some(CellRole::Single) => '#',
        Some(CellRole::Outside) | None => '.',
    }
}
