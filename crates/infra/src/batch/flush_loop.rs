//! Background consumer that turns queued events into delivered batches
//!
//! The loop is the only reader of the event queue and the only owner of the
//! [`Accumulator`], so batches leave in enqueue order and at most one delivery
//! is in flight. A flush is triggered by:
//! - the accumulator reaching `max_batch_size`
//! - the periodic timer, when anything is buffered
//! - a manual flush request, whose result is returned to the requester
//! - cancellation, which drains everything still queued before exiting
//!
//! Failures of loop-triggered flushes are reported to the [`ErrorObserver`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracebatch_core::ErrorObserver;
use tracebatch_domain::{impl_wire_name_conversions, DeliveryError, TelemetryEvent};
use tracing::{debug, info};

use super::accumulator::Accumulator;
use super::deliverer::Deliverer;
use super::metrics::BatchMetrics;
use super::retry::{DeliveryFailure, RetryPolicy};

/// Requests sent from the processor handle to the loop
#[derive(Debug)]
pub(crate) enum LoopCommand {
    /// Drain the queue and the buffered batch, then report the first error.
    Flush { ack: oneshot::Sender<Result<(), DeliveryError>> },
}

/// What triggered a batch delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Size,
    Interval,
    Manual,
    Shutdown,
}

impl_wire_name_conversions!(FlushReason {
    Size => "size",
    Interval => "interval",
    Manual => "manual",
    Shutdown => "shutdown",
});

pub(crate) struct FlushLoop {
    pub(crate) events: mpsc::Receiver<TelemetryEvent>,
    pub(crate) commands: mpsc::Receiver<LoopCommand>,
    pub(crate) cancellation: CancellationToken,
    pub(crate) accumulator: Accumulator,
    pub(crate) deliverer: Deliverer,
    pub(crate) retry: RetryPolicy,
    pub(crate) observer: Arc<dyn ErrorObserver>,
    pub(crate) metrics: Arc<BatchMetrics>,
    pub(crate) flush_interval: Duration,
}

impl FlushLoop {
    pub(crate) async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.cancellation.cancelled() => {
                    debug!("Flush loop cancelled; draining queue");
                    self.shutdown().await;
                    break;
                }
                Some(command) = self.commands.recv() => {
                    self.handle_command(command).await;
                }
                Some(event) = self.events.recv() => {
                    if let Some(batch) = self.accumulator.push(event) {
                        self.deliver_observed(batch, FlushReason::Size).await;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(batch) = self.accumulator.take() {
                        self.deliver_observed(batch, FlushReason::Interval).await;
                    }
                }
            }
        }

        info!("Flush loop stopped");
    }

    async fn handle_command(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::Flush { ack } => {
                let result = self.flush_all().await;
                // The requester may have given up waiting.
                let _ = ack.send(result);
            }
        }
    }

    /// Deliver everything queued or buffered, in order, in chunks of at most
    /// `max_batch_size`. Every chunk is attempted; the first error is returned.
    async fn flush_all(&mut self) -> Result<(), DeliveryError> {
        let mut first_error = None;

        while let Ok(event) = self.events.try_recv() {
            if let Some(batch) = self.accumulator.push(event) {
                if let Err(failure) = self.deliver(&batch, FlushReason::Manual).await {
                    first_error = first_error.or(Some(failure.error));
                }
            }
        }
        if let Some(batch) = self.accumulator.take() {
            if let Err(failure) = self.deliver(&batch, FlushReason::Manual).await {
                first_error = first_error.or(Some(failure.error));
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Final drain. Pending flush requests are answered first, then whatever
    /// is left goes out with failures reported to the observer.
    async fn shutdown(&mut self) {
        self.events.close();
        self.commands.close();

        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command).await;
        }

        while let Ok(event) = self.events.try_recv() {
            if let Some(batch) = self.accumulator.push(event) {
                self.deliver_observed(batch, FlushReason::Shutdown).await;
            }
        }
        if let Some(batch) = self.accumulator.take() {
            self.deliver_observed(batch, FlushReason::Shutdown).await;
        }
    }

    async fn deliver_observed(&self, batch: Vec<TelemetryEvent>, reason: FlushReason) {
        if let Err(failure) = self.deliver(&batch, reason).await {
            self.observer.on_delivery_failure(&failure.error, &batch);
        }
    }

    async fn deliver(
        &self,
        batch: &[TelemetryEvent],
        reason: FlushReason,
    ) -> Result<(), DeliveryFailure> {
        debug!(batch_size = batch.len(), reason = %reason, "Flushing batch");

        match self.retry.execute(&self.deliverer, batch).await {
            Ok(attempts) => {
                self.metrics.record_delivered(batch.len(), attempts);
                debug!(batch_size = batch.len(), attempts, "Batch delivered");
                Ok(())
            }
            Err(failure) => {
                self.metrics.record_failed(batch.len(), failure.attempts);
                Err(failure)
            }
        }
    }
}
