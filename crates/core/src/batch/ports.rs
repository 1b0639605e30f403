//! Port interfaces for batch delivery

use async_trait::async_trait;
use tracebatch_domain::{DeliveryError, TelemetryEvent};
use tracing::error;

/// Transport capable of sending one ordered batch of events
///
/// Implementations map their failures onto [`DeliveryError`] so the batch
/// processor can tell terminal failures from transient ones.
#[async_trait]
pub trait BatchSender: Send + Sync {
    /// Send `batch` in order, returning once the backend has answered.
    async fn send_batch(&self, batch: &[TelemetryEvent]) -> Result<(), DeliveryError>;
}

/// Receiver of batches that could not be delivered
///
/// Called from the flush loop after retries are exhausted or a terminal
/// failure occurred. Implementations must not block for long: the loop does not
/// consume the queue while the observer runs.
pub trait ErrorObserver: Send + Sync {
    fn on_delivery_failure(&self, error: &DeliveryError, batch: &[TelemetryEvent]);
}

/// Observer that records failed batches through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorObserver;

impl ErrorObserver for TracingErrorObserver {
    fn on_delivery_failure(&self, error: &DeliveryError, batch: &[TelemetryEvent]) {
        let first_event = batch.first().map(|event| event.id.as_str()).unwrap_or_default();
        error!(
            error = %error,
            status = ?error.status(),
            batch_size = batch.len(),
            first_event = %first_event,
            "Dropping telemetry batch after failed delivery"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracebatch_domain::Trace;

    use super::*;

    struct CountingSender {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl BatchSender for CountingSender {
        async fn send_batch(&self, batch: &[TelemetryEvent]) -> Result<(), DeliveryError> {
            self.batches.lock().unwrap().push(batch.len());
            if batch.is_empty() {
                return Err(DeliveryError::api(400, "empty batch"));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Collector {
        failures: Mutex<Vec<(DeliveryError, usize)>>,
    }

    impl ErrorObserver for Collector {
        fn on_delivery_failure(&self, error: &DeliveryError, batch: &[TelemetryEvent]) {
            self.failures.lock().unwrap().push((error.clone(), batch.len()));
        }
    }

    #[tokio::test]
    async fn sender_is_usable_as_trait_object() {
        let sender = Arc::new(CountingSender { batches: Mutex::new(Vec::new()) });
        let port: Arc<dyn BatchSender> = sender.clone();

        let batch =
            vec![TelemetryEvent::trace(Trace::new("a")), TelemetryEvent::trace(Trace::new("b"))];
        assert!(port.send_batch(&batch).await.is_ok());
        assert!(port.send_batch(&[]).await.unwrap_err().is_terminal());

        assert_eq!(*sender.batches.lock().unwrap(), vec![2, 0]);
    }

    #[test]
    fn observer_receives_error_and_batch() {
        let collector = Arc::new(Collector::default());
        let observer: Arc<dyn ErrorObserver> = collector.clone();
        let batch = vec![TelemetryEvent::trace(Trace::new("a"))];

        observer.on_delivery_failure(&DeliveryError::Network("down".into()), &batch);

        let failures = collector.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0], (DeliveryError::Network("down".into()), 1));
    }

    #[test]
    fn tracing_observer_handles_empty_batch() {
        TracingErrorObserver.on_delivery_failure(&DeliveryError::api(500, ""), &[]);
    }
}
