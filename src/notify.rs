use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for controller events: one firehose channel plus one channel
/// per room for events that concern a single room.
pub struct NotifyHub {
    all: broadcast::Sender<Event>,
    channels: DashMap<String, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            all: broadcast::channel(CHANNEL_CAPACITY).0,
            channels: DashMap::new(),
        }
    }

    /// Subscribe to every event.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.all.subscribe()
    }

    /// Subscribe to events for one room. Creates the channel if needed.
    pub fn subscribe(&self, resource_id: &str) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(resource_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send an event. No-op if nobody is listening.
    pub fn send(&self, event: &Event) {
        let _ = self.all.send(event.clone());
        if let Some(resource_id) = event.resource_id()
            && let Some(sender) = self.channels.get(resource_id)
        {
            let _ = sender.send(event.clone());
        }
    }

    /// Remove a room's channel (e.g. when it leaves the dataset).
    pub fn remove(&self, resource_id: &str) {
        self.channels.remove(resource_id);
    }

    /// Drop per-room channels nobody listens to any more.
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingId, CreateIntent};
    use crate::timeline::parse_key;

    fn create(resource_id: &str) -> Event {
        Event::BookingCreateRequested {
            intent: CreateIntent {
                resource_id: resource_id.into(),
                start_date: parse_key("2024-01-01").unwrap(),
                end_date: parse_key("2024-01-03").unwrap(),
                text: "Smith".into(),
                notes: String::new(),
            },
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("R1");
        let mut all = hub.subscribe_all();

        let event = create("R1");
        hub.send(&event);

        assert_eq!(rx.recv().await.unwrap(), event);
        assert_eq!(all.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn other_rooms_are_not_notified() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("R2");
        hub.send(&create("R1"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn roomless_events_reach_firehose_only() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe("R1");
        let mut all = hub.subscribe_all();
        let event = Event::BookingOpened {
            booking_id: BookingId::from("9"),
        };
        hub.send(&event);
        assert_eq!(all.recv().await.unwrap(), event);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send(&create("R1"));
    }

    #[test]
    fn prune_drops_dead_channels() {
        let hub = NotifyHub::new();
        let rx = hub.subscribe("R1");
        let _keep = hub.subscribe("R2");
        assert_eq!(hub.channel_count(), 2);
        drop(rx);
        hub.prune();
        assert_eq!(hub.channel_count(), 1);
        hub.remove("R2");
        assert_eq!(hub.channel_count(), 0);
    }
}
