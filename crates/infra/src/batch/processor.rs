//! Asynchronous batch processor with explicit lifecycle management
//!
//! Producers hand events to [`BatchProcessor::enqueue`] (or one of the typed
//! helpers), which never blocks: the event goes into a bounded queue or is
//! rejected with [`BatchError::QueueFull`]. A single background flush loop
//! groups queued events into ordered batches and delivers them through the
//! configured [`BatchSender`] with bounded retries.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tracebatch_domain::{BatchConfig, ClientConfig, Trace};
//! use tracebatch_infra::batch::BatchProcessor;
//! use tracebatch_infra::http::HttpBatchSender;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sender = Arc::new(HttpBatchSender::new(&ClientConfig::new("pk-lf-...", "sk-lf-..."))?);
//! let processor = BatchProcessor::new(sender, BatchConfig::default());
//!
//! processor.start()?;
//! let trace_id = processor.enqueue_trace(Trace::new("checkout"))?;
//! processor.flush().await?;
//! processor.stop().await?;
//! # let _ = trace_id;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracebatch_core::{BatchSender, ErrorObserver, TracingErrorObserver};
use tracebatch_domain::{
    impl_wire_name_conversions, BatchConfig, Event, Generation, GenerationUpdate, Score, Span,
    SpanUpdate, TelemetryEvent, Trace,
};
use tracing::{debug, info, instrument, warn};

use super::accumulator::Accumulator;
use super::deliverer::Deliverer;
use super::errors::{BatchError, BatchResult};
use super::flush_loop::{FlushLoop, LoopCommand};
use super::metrics::{BatchMetrics, BatchMetricsSnapshot};
use super::retry::RetryPolicy;

/// Pending manual flush requests the loop can hold.
const COMMAND_CAPACITY: usize = 32;

/// Lifecycle state visible to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Stopped,
    Running,
}

impl_wire_name_conversions!(ProcessorState {
    Stopped => "stopped",
    Running => "running",
});

struct RunningLoop {
    events: mpsc::Sender<TelemetryEvent>,
    commands: mpsc::Sender<LoopCommand>,
    cancellation: CancellationToken,
    task: JoinHandle<()>,
}

enum Lifecycle {
    Stopped,
    Running(RunningLoop),
}

/// Bounded, non-blocking event queue drained by a background flush loop
pub struct BatchProcessor {
    config: BatchConfig,
    deliverer: Deliverer,
    observer: Arc<dyn ErrorObserver>,
    metrics: Arc<BatchMetrics>,
    lifecycle: Mutex<Lifecycle>,
}

impl BatchProcessor {
    /// Create a stopped processor. Zero config values are replaced by their
    /// defaults; failures are logged by [`TracingErrorObserver`].
    pub fn new(sender: Arc<dyn BatchSender>, config: BatchConfig) -> Self {
        Self::with_observer(sender, config, Arc::new(TracingErrorObserver))
    }

    /// Create a stopped processor reporting failed batches to `observer`.
    pub fn with_observer(
        sender: Arc<dyn BatchSender>,
        config: BatchConfig,
        observer: Arc<dyn ErrorObserver>,
    ) -> Self {
        let config = config.normalized();
        Self {
            deliverer: Deliverer::new(sender, config.attempt_timeout),
            config,
            observer,
            metrics: Arc::new(BatchMetrics::new()),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        }
    }

    /// Effective configuration after defaults were applied.
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ProcessorState {
        match &*self.lifecycle.lock() {
            Lifecycle::Stopped => ProcessorState::Stopped,
            Lifecycle::Running(_) => ProcessorState::Running,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ProcessorState::Running
    }

    /// Spawn the flush loop on the current Tokio runtime.
    ///
    /// Starting a running processor is a no-op.
    ///
    /// # Errors
    /// Returns [`BatchError::Config`] when the batch or queue size exceeds its
    /// limit and [`BatchError::NoRuntime`] when called outside a Tokio runtime.
    #[instrument(skip(self))]
    pub fn start(&self) -> BatchResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        if matches!(*lifecycle, Lifecycle::Running(_)) {
            debug!("Batch processor already running");
            return Ok(());
        }

        self.config.validate()?;

        let runtime = Handle::try_current().map_err(|_| BatchError::NoRuntime)?;

        let (events_tx, events_rx) = mpsc::channel(self.config.queue_size);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let cancellation = CancellationToken::new();

        let flush_loop = FlushLoop {
            events: events_rx,
            commands: commands_rx,
            cancellation: cancellation.clone(),
            accumulator: Accumulator::new(self.config.max_batch_size),
            deliverer: self.deliverer.clone(),
            retry: RetryPolicy::from_config(&self.config),
            observer: Arc::clone(&self.observer),
            metrics: Arc::clone(&self.metrics),
            flush_interval: self.config.flush_interval,
        };
        let task = runtime.spawn(flush_loop.run());

        *lifecycle = Lifecycle::Running(RunningLoop {
            events: events_tx,
            commands: commands_tx,
            cancellation,
            task,
        });

        info!(
            max_batch_size = self.config.max_batch_size,
            queue_size = self.config.queue_size,
            flush_interval = ?self.config.flush_interval,
            "Batch processor started"
        );
        Ok(())
    }

    /// Stop accepting events, drain the queue and wait for the flush loop.
    ///
    /// The state becomes [`ProcessorState::Stopped`] immediately, so enqueues
    /// racing with `stop` fail with [`BatchError::NotRunning`]. Stopping a
    /// stopped processor is a no-op.
    ///
    /// # Errors
    /// Returns [`BatchError::ShutdownTimeout`] when the drain exceeds
    /// `shutdown_timeout`. The loop then keeps draining in the background.
    /// Returns [`BatchError::LoopPanicked`] or [`BatchError::LoopCancelled`]
    /// when the loop ended without finishing the drain.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> BatchResult<()> {
        let running = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Stopped => {
                    debug!("Batch processor already stopped");
                    return Ok(());
                }
                Lifecycle::Running(running) => running,
            }
        };

        info!("Stopping batch processor");

        let RunningLoop { events, commands, cancellation, task } = running;
        drop(events);
        drop(commands);
        cancellation.cancel();

        let shutdown_timeout = self.config.shutdown_timeout;
        match tokio::time::timeout(shutdown_timeout, task).await {
            Ok(Ok(())) => {
                info!("Batch processor stopped");
                Ok(())
            }
            Ok(Err(e)) if e.is_panic() => {
                warn!(error = %e, "Flush loop panicked");
                Err(BatchError::LoopPanicked(e.to_string()))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Flush loop was cancelled before draining");
                Err(BatchError::LoopCancelled)
            }
            Err(_) => {
                warn!(timeout = ?shutdown_timeout, "Flush loop did not drain within timeout");
                Err(BatchError::ShutdownTimeout(shutdown_timeout))
            }
        }
    }

    /// Queue an event without blocking.
    ///
    /// A missing identifier or timestamp is filled in first.
    ///
    /// # Errors
    /// Returns [`BatchError::NotRunning`] unless the processor is running and
    /// [`BatchError::QueueFull`] when the queue is at capacity. In both cases
    /// the event is dropped.
    pub fn enqueue(&self, mut event: TelemetryEvent) -> BatchResult<()> {
        event.fill_defaults();

        let lifecycle = self.lifecycle.lock();
        let Lifecycle::Running(running) = &*lifecycle else {
            self.metrics.record_rejected();
            return Err(BatchError::NotRunning);
        };

        match running.events.try_send(event) {
            Ok(()) => {
                self.metrics.record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(event)) => {
                self.metrics.record_rejected();
                debug!(event_id = %event.id, "Event queue full; dropping event");
                Err(BatchError::QueueFull { capacity: self.config.queue_size })
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.record_rejected();
                Err(BatchError::NotRunning)
            }
        }
    }

    /// Queue a trace, returning its identifier.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::enqueue`].
    pub fn enqueue_trace(&self, trace: Trace) -> BatchResult<String> {
        self.enqueue_identified(TelemetryEvent::trace(trace))
    }

    /// Queue a span, returning its identifier.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::enqueue`].
    pub fn enqueue_span(&self, span: Span) -> BatchResult<String> {
        self.enqueue_identified(TelemetryEvent::span(span))
    }

    /// Queue a partial update of the span `span_id`.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::enqueue`].
    pub fn enqueue_span_update(&self, span_id: &str, update: SpanUpdate) -> BatchResult<()> {
        self.enqueue(TelemetryEvent::span_update(span_id, update))
    }

    /// Queue a generation, returning its identifier.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::enqueue`].
    pub fn enqueue_generation(&self, generation: Generation) -> BatchResult<String> {
        self.enqueue_identified(TelemetryEvent::generation(generation))
    }

    /// Queue a partial update of the generation `generation_id`.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::enqueue`].
    pub fn enqueue_generation_update(
        &self,
        generation_id: &str,
        update: GenerationUpdate,
    ) -> BatchResult<()> {
        self.enqueue(TelemetryEvent::generation_update(generation_id, update))
    }

    /// Queue a point-in-time event, returning its identifier.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::enqueue`].
    pub fn enqueue_event(&self, event: Event) -> BatchResult<String> {
        self.enqueue_identified(TelemetryEvent::event(event))
    }

    /// Queue a score, returning its identifier.
    ///
    /// # Errors
    /// Fails like [`BatchProcessor::enqueue`].
    pub fn enqueue_score(&self, score: Score) -> BatchResult<String> {
        self.enqueue_identified(TelemetryEvent::score(score))
    }

    fn enqueue_identified(&self, event: TelemetryEvent) -> BatchResult<String> {
        let id = event.id.clone();
        self.enqueue(event)?;
        Ok(id)
    }

    /// Deliver everything queued so far and wait for the result.
    ///
    /// Events go out in order, in chunks of at most `max_batch_size`, each
    /// with the usual retries. Failures are returned here instead of going to
    /// the error observer.
    ///
    /// # Errors
    /// Returns [`BatchError::NotRunning`] when the processor is stopped and
    /// [`BatchError::Delivery`] with the first failure otherwise.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> BatchResult<()> {
        let commands = {
            let lifecycle = self.lifecycle.lock();
            match &*lifecycle {
                Lifecycle::Running(running) => running.commands.clone(),
                Lifecycle::Stopped => return Err(BatchError::NotRunning),
            }
        };

        let (ack, result) = oneshot::channel();
        commands.send(LoopCommand::Flush { ack }).await.map_err(|_| BatchError::NotRunning)?;
        result.await.map_err(|_| BatchError::NotRunning)?.map_err(BatchError::from)
    }

    /// Events waiting in the queue. Always zero when stopped.
    #[must_use]
    pub fn len(&self) -> usize {
        match &*self.lifecycle.lock() {
            Lifecycle::Running(running) => {
                running.events.max_capacity().saturating_sub(running.events.capacity())
            }
            Lifecycle::Stopped => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn metrics(&self) -> BatchMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for BatchProcessor {
    fn drop(&mut self) {
        if let Lifecycle::Running(running) = self.lifecycle.get_mut() {
            warn!("BatchProcessor dropped while running; cancelling flush loop");
            running.cancellation.cancel();
        }
    }
}
