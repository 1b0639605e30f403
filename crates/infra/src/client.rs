//! Telemetry client facade
//!
//! Owns a started [`BatchProcessor`] and the transport behind it. Record
//! creation goes through the processor and never blocks; [`send_now`]
//! bypasses the queue for callers that need a synchronous round trip.
//!
//! [`send_now`]: TelemetryClient::send_now

use std::fmt;
use std::sync::Arc;

use tracebatch_core::{BatchSender, ErrorObserver, TracingErrorObserver};
use serde_json::Value;
use tracebatch_domain::{
    BatchConfig, Config, DeliveryError, Event, Generation, GenerationUpdate, ObservationType,
    Score, Span, SpanUpdate, TelemetryEvent, Trace, TraceContext,
};
use tracing::instrument;

use crate::batch::{BatchProcessor, BatchResult};
use crate::http::HttpBatchSender;
use crate::observation::Observation;

/// Entry point for recording telemetry
pub struct TelemetryClient {
    transport: Arc<dyn BatchSender>,
    processor: BatchProcessor,
}

impl TelemetryClient {
    /// Build a client around `transport` and start its processor.
    ///
    /// # Errors
    /// Returns `BatchError::Config` for oversized limits and
    /// `BatchError::NoRuntime` outside a Tokio runtime.
    pub fn new(transport: Arc<dyn BatchSender>, config: BatchConfig) -> BatchResult<Self> {
        Self::with_observer(transport, config, Arc::new(TracingErrorObserver))
    }

    /// Like [`TelemetryClient::new`], reporting failed batches to `observer`.
    ///
    /// # Errors
    /// Fails like [`TelemetryClient::new`].
    pub fn with_observer(
        transport: Arc<dyn BatchSender>,
        config: BatchConfig,
        observer: Arc<dyn ErrorObserver>,
    ) -> BatchResult<Self> {
        let processor = BatchProcessor::with_observer(Arc::clone(&transport), config, observer);
        processor.start()?;
        Ok(Self { transport, processor })
    }

    /// Build an HTTP-backed client from loaded configuration.
    ///
    /// # Errors
    /// Returns `BatchError::Config` for invalid client settings and
    /// `BatchError::NoRuntime` outside a Tokio runtime.
    pub fn from_config(config: &Config) -> BatchResult<Self> {
        let transport = Arc::new(HttpBatchSender::new(&config.client)?);
        Self::new(transport, config.batch.clone())
    }

    /// Record a trace; returns its identifier.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::QueueFull` when the queue is at capacity.
    pub fn create_trace(&self, trace: Trace) -> BatchResult<String> {
        self.processor.enqueue_trace(trace)
    }

    /// Record a span; returns its identifier.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::QueueFull` when the queue is at capacity.
    pub fn create_span(&self, span: Span) -> BatchResult<String> {
        self.processor.enqueue_span(span)
    }

    /// Record a partial update of the span `span_id`.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::QueueFull` when the queue is at capacity.
    pub fn update_span(&self, span_id: &str, update: SpanUpdate) -> BatchResult<()> {
        self.processor.enqueue_span_update(span_id, update)
    }

    /// Record a generation; returns its identifier.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::QueueFull` when the queue is at capacity.
    pub fn create_generation(&self, generation: Generation) -> BatchResult<String> {
        self.processor.enqueue_generation(generation)
    }

    /// Record a partial update of the generation `generation_id`.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::QueueFull` when the queue is at capacity.
    pub fn update_generation(
        &self,
        generation_id: &str,
        update: GenerationUpdate,
    ) -> BatchResult<()> {
        self.processor.enqueue_generation_update(generation_id, update)
    }

    /// Record a point-in-time event; returns its identifier.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::QueueFull` when the queue is at capacity.
    pub fn create_event(&self, event: Event) -> BatchResult<String> {
        self.processor.enqueue_event(event)
    }

    /// Record a score; returns its identifier.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::QueueFull` when the queue is at capacity.
    pub fn create_score(&self, score: Score) -> BatchResult<String> {
        self.processor.enqueue_score(score)
    }

    /// Start an observation at the root of a new trace.
    ///
    /// The create event is queued right away; call [`Observation::end`] to
    /// record its end time.
    ///
    /// # Errors
    /// Fails like [`TelemetryClient::create_span`].
    pub fn start_observation(
        &self,
        kind: ObservationType,
        name: impl Into<String>,
        input: Option<Value>,
    ) -> BatchResult<Observation<'_>> {
        self.start_observation_in(&TraceContext::new_trace(), kind, name, input)
    }

    /// Start an observation at `parent`, inheriting its trace and parent
    /// observation.
    ///
    /// # Errors
    /// Fails like [`TelemetryClient::create_span`].
    pub fn start_observation_in(
        &self,
        parent: &TraceContext,
        kind: ObservationType,
        name: impl Into<String>,
        input: Option<Value>,
    ) -> BatchResult<Observation<'_>> {
        Observation::start(self, parent, kind, name.into(), input)
    }

    /// Events waiting to be delivered.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.processor.len()
    }

    /// Deliver everything recorded so far and wait for the result.
    ///
    /// # Errors
    /// Returns `BatchError::NotRunning` after shutdown and
    /// `BatchError::Delivery` with the first delivery failure.
    pub async fn flush(&self) -> BatchResult<()> {
        self.processor.flush().await
    }

    /// Drain pending events and stop the processor.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::stop`].
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> BatchResult<()> {
        self.processor.stop().await
    }

    #[must_use]
    pub const fn processor(&self) -> &BatchProcessor {
        &self.processor
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn BatchSender> {
        &self.transport
    }

    /// Send `events` as one batch immediately, without queueing or retries.
    ///
    /// # Errors
    /// Returns the transport's error unchanged.
    pub async fn send_now(&self, mut events: Vec<TelemetryEvent>) -> Result<(), DeliveryError> {
        if events.is_empty() {
            return Ok(());
        }
        for event in &mut events {
            event.fill_defaults();
        }
        self.transport.send_batch(&events).await
    }
}

impl fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tracebatch_domain::EventKind;

    use super::*;

    #[derive(Default)]
    struct RecordingSender {
        batches: Mutex<Vec<Vec<TelemetryEvent>>>,
    }

    #[async_trait]
    impl BatchSender for RecordingSender {
        async fn send_batch(&self, batch: &[TelemetryEvent]) -> Result<(), DeliveryError> {
            self.batches.lock().push(batch.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_records_flow_through_processor() {
        let sender = Arc::new(RecordingSender::default());
        let client = TelemetryClient::new(sender.clone(), BatchConfig::default()).unwrap();

        let trace_id = client.create_trace(Trace::new("request")).unwrap();
        let span_id = client.create_span(Span::new(&trace_id, "db")).unwrap();
        client.update_span(&span_id, SpanUpdate::default()).unwrap();
        client.create_score(Score::new(&trace_id, "quality", 0.9)).unwrap();

        client.flush().await.unwrap();
        client.shutdown().await.unwrap();

        let batches = sender.batches.lock();
        let kinds: Vec<_> = batches.iter().flatten().map(TelemetryEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TraceCreate,
                EventKind::SpanCreate,
                EventKind::SpanUpdate,
                EventKind::ScoreCreate
            ]
        );
        assert_eq!(batches[0][0].id, trace_id);
        assert_eq!(batches[0][2].id, span_id);
    }

    #[tokio::test]
    async fn test_send_now_bypasses_queue() {
        let sender = Arc::new(RecordingSender::default());
        let client = TelemetryClient::new(sender.clone(), BatchConfig::default()).unwrap();

        client.send_now(vec![TelemetryEvent::trace(Trace::new("direct"))]).await.unwrap();
        client.send_now(Vec::new()).await.unwrap();

        let batches = sender.batches.lock();
        assert_eq!(batches.len(), 1);
        assert!(batches[0][0].timestamp.is_some());
        assert_eq!(client.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_records_rejected_after_shutdown() {
        let client =
            TelemetryClient::new(Arc::new(RecordingSender::default()), BatchConfig::default())
                .unwrap();
        client.shutdown().await.unwrap();

        assert!(client.create_trace(Trace::new("late")).is_err());
        assert!(!client.processor().is_running());
    }

    #[test]
    fn test_from_config_requires_runtime() {
        let config = Config {
            client: tracebatch_domain::ClientConfig::new("pk", "sk"),
            batch: BatchConfig::default(),
        };
        assert!(matches!(
            TelemetryClient::from_config(&config),
            Err(crate::batch::BatchError::NoRuntime)
        ));
    }
}
