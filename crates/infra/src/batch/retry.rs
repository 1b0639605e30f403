//! Retry with exponential backoff

use std::time::Duration;

use tracebatch_domain::{BatchConfig, DeliveryError, DeliveryOutcome, TelemetryEvent};
use tracing::warn;

use super::deliverer::Deliverer;

/// A batch that could not be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Attempts made, including the first
    pub attempts: u32,
    pub error: DeliveryError,
}

/// Bounded retry schedule: one attempt plus up to `max_retries` retries
///
/// The wait before retry `n` is `initial_delay * 2^(n-1)`. Terminal failures
/// stop immediately, and no wait follows the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self { max_retries, initial_delay }
    }

    pub const fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before the given retry (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1_u32 << exponent)
    }

    /// Deliver `batch`, retrying transient failures.
    ///
    /// Returns the number of attempts on success.
    pub async fn execute(
        &self,
        deliverer: &Deliverer,
        batch: &[TelemetryEvent],
    ) -> Result<u32, DeliveryFailure> {
        let mut attempt = 0_u32;
        loop {
            attempt = attempt.saturating_add(1);
            match deliverer.attempt(batch).await {
                DeliveryOutcome::Delivered => return Ok(attempt),
                DeliveryOutcome::Terminal(error) => {
                    warn!(
                        attempt,
                        status = ?error.status(),
                        error = %error,
                        "Batch rejected; not retrying"
                    );
                    return Err(DeliveryFailure { attempts: attempt, error });
                }
                DeliveryOutcome::Transient(error) => {
                    if attempt >= self.max_attempts() {
                        return Err(DeliveryFailure { attempts: attempt, error });
                    }
                    let delay = self.delay_before_retry(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts(),
                        delay = ?delay,
                        error = %error,
                        "Batch delivery failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
