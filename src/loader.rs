use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::model::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Io(String),
    Decode(String),
    /// Superseded by a newer load or the view was torn down.
    Cancelled,
    /// Source-specific failure (network, upstream service, ...).
    Source(String),
    /// Snapshot decoded but violates a limit.
    Rejected(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "io error: {e}"),
            LoadError::Decode(e) => write!(f, "decode error: {e}"),
            LoadError::Cancelled => write!(f, "load cancelled"),
            LoadError::Source(e) => write!(f, "source error: {e}"),
            LoadError::Rejected(e) => write!(f, "snapshot rejected: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Where resources and bookings come from. Fetching happens outside the
/// controller; the result is handed over as a complete snapshot.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot, LoadError>;
}

/// Reads a `{"resources": [...], "bookings": [...]}` JSON file.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for JsonFileSource {
    async fn fetch(&self) -> Result<Snapshot, LoadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| LoadError::Io(format!("{}: {e}", self.path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| LoadError::Decode(e.to_string()))
    }
}

/// Fixed in-memory snapshot.
pub struct StaticSource(pub Snapshot);

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch(&self) -> Result<Snapshot, LoadError> {
        Ok(self.0.clone())
    }
}

/// Handle for one load request. Only the newest ticket may be applied.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    pub generation: u64,
    token: CancellationToken,
}

impl LoadTicket {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Hands out generation-numbered tickets; a new ticket cancels the previous.
#[derive(Debug, Default)]
pub struct Loader {
    generation: u64,
    current: Option<CancellationToken>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn begin(&mut self) -> LoadTicket {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        self.generation += 1;
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        LoadTicket {
            generation: self.generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && !ticket.is_cancelled()
    }

    /// Cancel whatever is in flight (view teardown).
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

/// Run the source, racing it against the ticket's cancellation.
pub async fn fetch(source: &dyn DataSource, ticket: &LoadTicket) -> Result<Snapshot, LoadError> {
    if ticket.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    let started = Instant::now();
    let result = tokio::select! {
        _ = ticket.token.cancelled() => Err(LoadError::Cancelled),
        r = source.fetch() => r,
    };
    metrics::histogram!(crate::observability::LOAD_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    result
}

/// Spawn [`fetch`] on the runtime. The ticket travels with the result so the
/// caller can hand both to the controller.
pub fn spawn_fetch(
    source: Arc<dyn DataSource>,
    ticket: LoadTicket,
) -> JoinHandle<(LoadTicket, Result<Snapshot, LoadError>)> {
    tokio::spawn(async move {
        let result = fetch(source.as_ref(), &ticket).await;
        (ticket, result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Resource, ResourceGroup};
    use std::time::Duration;

    struct SlowSource {
        delay: Duration,
        snapshot: Snapshot,
    }

    #[async_trait]
    impl DataSource for SlowSource {
        async fn fetch(&self) -> Result<Snapshot, LoadError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.snapshot.clone())
        }
    }

    fn snapshot(group: &str) -> Snapshot {
        Snapshot {
            resources: vec![ResourceGroup::new(group, group, vec![Resource::new("R1", "101")])],
            bookings: vec![],
        }
    }

    #[test]
    fn new_ticket_cancels_previous() {
        let mut loader = Loader::new();
        let first = loader.begin();
        let second = loader.begin();
        assert!(first.is_cancelled());
        assert!(!loader.is_current(&first));
        assert!(loader.is_current(&second));
        assert_eq!(second.generation, 2);
    }

    #[test]
    fn cancel_invalidates_current() {
        let mut loader = Loader::new();
        let ticket = loader.begin();
        loader.cancel();
        assert!(!loader.is_current(&ticket));
    }

    #[test]
    fn static_source_fetch() {
        let mut loader = Loader::new();
        let ticket = loader.begin();
        let source = StaticSource(snapshot("G1"));
        let result = tokio_test::block_on(fetch(&source, &ticket));
        assert_eq!(result.unwrap().resources[0].id, "G1");
    }

    #[tokio::test]
    async fn superseded_fetch_resolves_cancelled() {
        let mut loader = Loader::new();
        let slow: Arc<dyn DataSource> = Arc::new(SlowSource {
            delay: Duration::from_secs(30),
            snapshot: snapshot("OLD"),
        });
        let stale = spawn_fetch(slow, loader.begin());

        let fast: Arc<dyn DataSource> = Arc::new(StaticSource(snapshot("NEW")));
        let fresh = spawn_fetch(fast, loader.begin());

        let (ticket, result) = stale.await.unwrap();
        assert_eq!(result, Err(LoadError::Cancelled));
        assert!(!loader.is_current(&ticket));

        let (ticket, result) = fresh.await.unwrap();
        assert!(loader.is_current(&ticket));
        assert_eq!(result.unwrap().resources[0].id, "NEW");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let mut loader = Loader::new();
        let ticket = loader.begin();
        let source = JsonFileSource::new("/nonexistent/roomgrid/data.json");
        assert!(matches!(fetch(&source, &ticket).await, Err(LoadError::Io(_))));
    }

    #[tokio::test]
    async fn json_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("roomgrid_test_loader_{}", ulid::Ulid::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("data.json");
        std::fs::write(
            &path,
            r#"{"resources": [{"id": "G1", "name": "Block A", "expanded": true,
                 "children": [{"id": "R1", "name": "101"}]}],
                "bookings": [{"id": 5, "resourceId": "R1",
                 "startDate": "2024-01-02", "endDate": "2024-01-04", "text": "Smith"}]}"#,
        )
        .unwrap();

        let mut loader = Loader::new();
        let ticket = loader.begin();
        let snap = fetch(&JsonFileSource::new(&path), &ticket).await.unwrap();
        assert_eq!(snap.resources[0].children.len(), 1);
        assert_eq!(snap.bookings[0].id.as_str(), "5");

        std::fs::write(&path, "{ broken").unwrap();
        assert!(matches!(
            fetch(&JsonFileSource::new(&path), &ticket).await,
            Err(LoadError::Decode(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
