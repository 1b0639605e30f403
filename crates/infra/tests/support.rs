//! Shared test doubles for the batch pipeline

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracebatch_core::{BatchSender, ErrorObserver};
use tracebatch_domain::{BatchConfig, DeliveryError, TelemetryEvent, Trace};

/// Transport that records every attempt and replays scripted results.
///
/// Once the script runs out every attempt succeeds, unless a default failure
/// was set with [`RecordingSender::always_failing`].
#[derive(Default)]
pub struct RecordingSender {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    fallback: Option<DeliveryError>,
    delay: Duration,
    attempts: Mutex<Vec<Attempt>>,
}

/// One call to `send_batch`
#[derive(Debug, Clone)]
pub struct Attempt {
    pub at: Instant,
    pub ids: Vec<String>,
    pub succeeded: bool,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(results: Vec<Result<(), DeliveryError>>) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(results.into()), ..Self::default() })
    }

    pub fn always_failing(error: DeliveryError) -> Arc<Self> {
        Arc::new(Self { fallback: Some(error), ..Self::default() })
    }

    /// Every attempt sleeps for `delay` before answering.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay, ..Self::default() })
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Identifiers of successfully delivered events, in delivery order.
    pub fn delivered_ids(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|attempt| attempt.succeeded)
            .flat_map(|attempt| attempt.ids.clone())
            .collect()
    }

    /// Sizes of successfully delivered batches.
    pub fn delivered_batch_sizes(&self) -> Vec<usize> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|attempt| attempt.succeeded)
            .map(|attempt| attempt.ids.len())
            .collect()
    }
}

#[async_trait]
impl BatchSender for RecordingSender {
    async fn send_batch(&self, batch: &[TelemetryEvent]) -> Result<(), DeliveryError> {
        let at = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        let result = match (scripted, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(error)) => Err(error.clone()),
            (None, None) => Ok(()),
        };

        self.attempts.lock().unwrap().push(Attempt {
            at,
            ids: batch.iter().map(|event| event.id.clone()).collect(),
            succeeded: result.is_ok(),
        });
        result
    }
}

/// Observer that keeps every reported failure.
#[derive(Default)]
pub struct CollectingObserver {
    failures: Mutex<Vec<(DeliveryError, Vec<String>)>>,
}

impl CollectingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failures(&self) -> Vec<(DeliveryError, Vec<String>)> {
        self.failures.lock().unwrap().clone()
    }
}

impl ErrorObserver for CollectingObserver {
    fn on_delivery_failure(&self, error: &DeliveryError, batch: &[TelemetryEvent]) {
        let ids = batch.iter().map(|event| event.id.clone()).collect();
        self.failures.lock().unwrap().push((error.clone(), ids));
    }
}

/// Config with timers long enough that only the behaviour under test fires.
pub fn quiet_config() -> BatchConfig {
    BatchConfig {
        max_batch_size: 100,
        flush_interval: Duration::from_secs(3600),
        max_retries: 3,
        retry_delay: Duration::from_millis(10),
        queue_size: 1_000,
        shutdown_timeout: Duration::from_secs(5),
        attempt_timeout: Duration::from_secs(5),
    }
}

pub fn trace_event(name: &str) -> TelemetryEvent {
    TelemetryEvent::trace(Trace::new(name))
}

/// Poll `condition` every few milliseconds until it holds or `within` passes.
pub async fn wait_until(within: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
