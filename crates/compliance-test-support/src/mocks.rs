//! Mock implementations of core port traits.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use compliance_core::ports::{
    BatchSummary, ImageSource, ImageStore, PredictionReply, PredictionRequest,
    PredictionTransport, ProgressEvent, ProgressSink, ResultOutput, TransportError,
};
use compliance_core::{ComplianceRecord, ImageHandle};

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built handles and tracks iteration for assertions.
pub struct MockImageSource {
    handles: Vec<ImageHandle>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given handles.
    #[must_use]
    pub fn new(handles: Vec<ImageHandle>) -> Self {
        Self {
            handles,
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn handles(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageHandle>> + Send + '_> {
        if let Ok(mut c) = self.iteration_count.lock() {
            *c += 1;
        }
        Box::new(self.handles.iter().cloned().map(Ok))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.handles.len())
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures records for later assertions.
pub struct MockResultOutput {
    records: Arc<Mutex<Vec<ComplianceRecord>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured records.
    #[must_use]
    pub fn records(&self) -> Vec<ComplianceRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, record: &ComplianceRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Ok(mut c) = self.flush_count.lock() {
            *c += 1;
        }
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Started { .. }))
            .count()
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Completed { .. }))
            .count()
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }

    /// Returns the summary from the `Finished` event, if any.
    #[must_use]
    pub fn summary(&self) -> Option<BatchSummary> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished(summary) => Some(*summary),
            _ => None,
        })
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[derive(Debug, Clone)]
enum TransportBehaviour {
    Reply { status: u16, body: String },
    Fail(String),
    Hang,
}

/// Mock implementation of `PredictionTransport` for testing.
///
/// Answers every request the same way and records what was sent.
pub struct MockPredictionTransport {
    behaviour: TransportBehaviour,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    file_names: Mutex<Vec<String>>,
}

/// Counts one request as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockPredictionTransport {
    fn with_behaviour(behaviour: TransportBehaviour) -> Self {
        Self {
            behaviour,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            file_names: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `status` and a raw `body`.
    #[must_use]
    pub fn reply(status: u16, body: impl Into<String>) -> Self {
        Self::with_behaviour(TransportBehaviour::Reply {
            status,
            body: body.into(),
        })
    }

    /// Replies 200 with a single prediction.
    #[must_use]
    pub fn predicting(label: &str, probability: f64) -> Self {
        Self::reply(
            200,
            format!(r#"{{"predictions":[{{"tagName":"{label}","probability":{probability}}}]}}"#),
        )
    }

    /// Fails every request with a connection error.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behaviour(TransportBehaviour::Fail(message.into()))
    }

    /// Never answers.
    #[must_use]
    pub fn hanging() -> Self {
        Self::with_behaviour(TransportBehaviour::Hang)
    }

    /// Waits `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of requests received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most requests that were being answered at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// File names of received requests, in order.
    #[must_use]
    pub fn file_names(&self) -> Vec<String> {
        self.file_names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PredictionTransport for MockPredictionTransport {
    async fn predict(&self, request: PredictionRequest) -> Result<PredictionReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak_in_flight);
        self.file_names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.file_name);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behaviour {
            TransportBehaviour::Reply { status, body } => Ok(PredictionReply {
                status: *status,
                body: body.clone().into_bytes(),
            }),
            TransportBehaviour::Fail(message) => Err(TransportError::Connect(message.clone())),
            TransportBehaviour::Hang => std::future::pending().await,
        }
    }
}

/// Mock implementation of `ImageStore` for testing.
///
/// Serves bytes from an in-memory map keyed by reference.
#[derive(Default)]
pub struct MockImageStore {
    entries: HashMap<String, Vec<u8>>,
    reads: AtomicUsize,
}

impl MockImageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.entries.insert(reference.into(), bytes);
        self
    }

    /// Number of read attempts, including misses.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn read(&self, reference: &str) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.entries.get(reference).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{reference} not stored"))
        })
    }
}
