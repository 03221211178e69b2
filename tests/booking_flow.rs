use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::sync::mpsc;
use ulid::Ulid;

use roomgrid::config::GridConfig;
use roomgrid::controller::{Controller, LoadStatus};
use roomgrid::loader::{self, DataSource, JsonFileSource, LoadError, StaticSource};
use roomgrid::model::*;
use roomgrid::notify::NotifyHub;
use roomgrid::store::BookingStore;
use roomgrid::timeline::parse_key;

// ── Test infrastructure ──────────────────────────────────────

const DATA: &str = r##"{
  "resources": [
    {"id": "G1", "name": "Block A", "expanded": true,
     "children": [{"id": "R1", "name": "101"}, {"id": "R2", "name": "102"}]},
    {"id": "G2", "name": "Block B",
     "children": [{"id": "R3", "name": "201"}]}
  ],
  "bookings": [
    {"id": 1, "resourceId": "R1", "startDate": "2024-01-02", "endDate": "2024-01-05", "text": "Smith"},
    {"id": "22", "resourceId": "R2", "startDate": "2023-12-28", "endDate": "2024-01-03",
     "text": "Jones", "meta": "{\"barColor\": \"#ff0000\", \"paid\": 50}"},
    {"id": "3", "resourceId": "R3", "startDate": "2024-01-09", "endDate": "2024-01-11",
     "text": "Brown", "backColor": "#ffeeee", "meta": "not json"}
  ]
}"##;

fn write_data(contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("roomgrid_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("grid.json");
    std::fs::write(&path, contents).unwrap();
    path
}

fn date(key: &str) -> chrono::NaiveDate {
    parse_key(key).unwrap()
}

fn config() -> GridConfig {
    GridConfig {
        days: 30,
        start_date: Some(date("2024-01-01")),
        ..GridConfig::default()
    }
}

async fn loaded_controller() -> (Controller, Arc<NotifyHub>) {
    let hub = Arc::new(NotifyHub::new());
    let mut controller = Controller::new(config(), hub.clone()).unwrap();
    controller.resize(150.0 + 40.0 * 30.0, 300.0);
    let source = JsonFileSource::new(write_data(DATA));
    assert_eq!(controller.load_from(&source).await, LoadStatus::Applied);
    (controller, hub)
}

/// Relay one room's events into an mpsc channel.
fn listen(hub: &NotifyHub, resource_id: &str) -> mpsc::UnboundedReceiver<Event> {
    let rx = hub.subscribe(resource_id);
    let (tx, out) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let events = stream::unfold(rx, |mut rx| async move { rx.recv().await.ok().map(|ev| (ev, rx)) });
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    out
}

/// Wait for an event with timeout.
async fn recv_event(rx: &mut mpsc::UnboundedReceiver<Event>, timeout: Duration) -> Option<Event> {
    tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
}

struct SlowSource(Duration, Snapshot);

#[async_trait]
impl DataSource for SlowSource {
    async fn fetch(&self) -> Result<Snapshot, LoadError> {
        tokio::time::sleep(self.0).await;
        Ok(self.1.clone())
    }
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn select_confirm_then_drag_to_other_room() {
    let (mut controller, hub) = loaded_controller().await;
    let mut room1 = listen(&hub, "R1");
    let mut room2 = listen(&hub, "R2");
    let mut store = BookingStore::new(controller.bookings().to_vec()).reject_overlap(true);

    let ids: Vec<&str> = controller.rows().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["G1", "R1", "R2", "G2"]);

    // Range selection on 101, dragged backward.
    controller.cell_down("R1", date("2024-01-13")).unwrap();
    controller.cell_enter(0, "R1", date("2024-01-10")).unwrap();
    let settled = controller.pointer_up().unwrap();

    let created = controller
        .confirm(BookingForm {
            text: "Garcia".into(),
            notes: "two guests".into(),
        })
        .unwrap();
    assert!(store.apply(&created).unwrap());
    controller.replace_bookings(store.bookings().to_vec()).unwrap();

    assert_eq!(recv_event(&mut room1, Duration::from_secs(2)).await, Some(settled));
    assert_eq!(recv_event(&mut room1, Duration::from_secs(2)).await, Some(created));

    let new_id = store.bookings().last().unwrap().id.clone();
    let placement = controller.booking_placement(&new_id).unwrap();
    assert_eq!((placement.first_column, placement.last_column), (9, 11));

    // Booking-id filter isolates the new booking's room.
    controller.set_booking_filter(new_id.as_str()).unwrap();
    let ids: Vec<&str> = controller.rows().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["G1", "R1"]);
    controller.clear_filters();

    // Drag it from 101 to 102, six days later.
    let from = controller.geometry().cell_center(1, 9);
    let to = controller.geometry().cell_center(2, 15);
    controller.booking_down(&new_id, from, 100).unwrap();
    assert!(controller.pointer_move(to, 110));
    let moved = controller.release(to, 120).unwrap();
    assert_eq!(
        moved,
        Event::BookingMoveRequested {
            intent: MoveIntent {
                booking_id: new_id.clone(),
                resource_id: "R2".into(),
                start_date: date("2024-01-16"),
                end_date: date("2024-01-19"),
            }
        }
    );
    assert!(store.apply(&moved).unwrap());
    controller.replace_bookings(store.bookings().to_vec()).unwrap();

    assert_eq!(recv_event(&mut room2, Duration::from_secs(2)).await, Some(moved));
    assert!(recv_event(&mut room1, Duration::from_millis(100)).await.is_none());

    let frame = controller.render();
    let room2_row = frame.rows.iter().find(|r| r.row.id() == "R2").unwrap();
    let texts: Vec<&str> = room2_row.bookings.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(texts, vec!["Jones", "Garcia"]);
    assert!(frame.rows.iter().find(|r| r.row.id() == "R1").unwrap().bookings.len() == 1);
}

#[tokio::test]
async fn display_metadata_degrades_gracefully() {
    let (mut controller, _hub) = loaded_controller().await;
    controller.toggle_group("G2").unwrap();
    let frame = controller.render();

    let jones = &frame.rows.iter().find(|r| r.row.id() == "R2").unwrap().bookings[0];
    assert_eq!(jones.bar_color, "#ff0000");
    assert_eq!(jones.back_color, DEFAULT_BACK_COLOR);

    // Unparsable payload: defaults, but the booking's own colour is kept.
    let brown = &frame.rows.iter().find(|r| r.row.id() == "R3").unwrap().bookings[0];
    assert_eq!(brown.back_color, "#ffeeee");
    assert_eq!(brown.bar_color, DEFAULT_BAR_COLOR);
}

#[tokio::test]
async fn failed_reload_keeps_grid() {
    let (mut controller, hub) = loaded_controller().await;
    let mut all = hub.subscribe_all();
    let before = controller.rows().to_vec();

    let broken = JsonFileSource::new(write_data("{ \"resources\": ["));
    let status = controller.load_from(&broken).await;
    assert!(matches!(status, LoadStatus::Failed(_)));
    assert_eq!(controller.rows(), before.as_slice());
    assert_eq!(controller.bookings().len(), 3);
    assert!(controller.last_load_error().unwrap().starts_with("decode error"));
    assert!(matches!(all.recv().await.unwrap(), Event::LoadFailed { .. }));
}

#[tokio::test]
async fn newer_load_wins_over_slow_one() {
    let (mut controller, _hub) = loaded_controller().await;

    let slow: Arc<dyn DataSource> = Arc::new(SlowSource(
        Duration::from_millis(200),
        Snapshot {
            resources: vec![ResourceGroup::new("OLD", "Old wing", vec![Resource::new("X1", "900")])],
            bookings: vec![],
        },
    ));
    let fast: Arc<dyn DataSource> = Arc::new(StaticSource(Snapshot {
        resources: vec![ResourceGroup::new("NEW", "New wing", vec![Resource::new("Y1", "500")]).expanded(true)],
        bookings: vec![],
    }));

    let stale = loader::spawn_fetch(slow, controller.begin_load());
    let fresh = loader::spawn_fetch(fast, controller.begin_load());

    let (ticket, result) = fresh.await.unwrap();
    assert_eq!(controller.finish_load(ticket, result), LoadStatus::Applied);

    let (ticket, result) = stale.await.unwrap();
    assert_eq!(controller.finish_load(ticket, result), LoadStatus::Discarded);

    let ids: Vec<&str> = controller.rows().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["NEW", "Y1"]);
}

#[tokio::test]
async fn overlapping_move_is_rejected_by_store() {
    let (mut controller, _hub) = loaded_controller().await;
    let mut store = BookingStore::new(controller.bookings().to_vec()).reject_overlap(true);

    // Drop Smith (101, Jan 2-5) onto 102 on Jan 1, where Jones stays until Jan 3.
    let from = controller.geometry().cell_center(1, 1);
    let to = controller.geometry().cell_center(2, 0);
    controller.booking_down(&BookingId::from("1"), from, 0).unwrap();
    controller.pointer_move(to, 10);
    let moved = controller.release(to, 20).unwrap();

    assert!(store.apply(&moved).is_err());
    assert_eq!(store.get(&BookingId::from("1")).unwrap().resource_id, "R1");
}
