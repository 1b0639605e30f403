//! Single delivery attempt with a time budget

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracebatch_core::BatchSender;
use tracebatch_domain::{DeliveryError, DeliveryOutcome, TelemetryEvent};
use tracing::debug;

/// Wraps a transport so every attempt is bounded and classified
#[derive(Clone)]
pub struct Deliverer {
    sender: Arc<dyn BatchSender>,
    attempt_timeout: Duration,
}

impl Deliverer {
    pub fn new(sender: Arc<dyn BatchSender>, attempt_timeout: Duration) -> Self {
        Self { sender, attempt_timeout }
    }

    pub const fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Send `batch` once. An empty batch counts as delivered without calling
    /// the transport.
    pub async fn attempt(&self, batch: &[TelemetryEvent]) -> DeliveryOutcome {
        if batch.is_empty() {
            return DeliveryOutcome::Delivered;
        }

        let result =
            match tokio::time::timeout(self.attempt_timeout, self.sender.send_batch(batch)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(
                        timeout = ?self.attempt_timeout,
                        batch_size = batch.len(),
                        "Delivery attempt timed out"
                    );
                    Err(DeliveryError::Timeout(self.attempt_timeout))
                }
            };

        DeliveryOutcome::classify(result)
    }
}

impl fmt::Debug for Deliverer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deliverer").field("attempt_timeout", &self.attempt_timeout).finish()
    }
}
