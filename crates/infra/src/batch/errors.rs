//! Batch processor error types

use std::time::Duration;

use thiserror::Error;
use tracebatch_domain::{DeliveryError, DomainError};

/// Errors surfaced by the batch processor and the client facade
#[derive(Debug, Error)]
pub enum BatchError {
    /// The bounded queue is at capacity; the event was dropped.
    #[error("Event queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Batch processor is not running")]
    NotRunning,

    /// The flush loop did not finish draining in time. It keeps running in
    /// the background.
    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("Batch processor requires a Tokio runtime")]
    NoRuntime,

    #[error("Flush loop terminated abnormally: {0}")]
    LoopPanicked(String),

    /// The runtime cancelled the flush loop before it finished draining.
    #[error("Flush loop was cancelled before draining")]
    LoopCancelled,

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Config(#[from] DomainError),
}

impl BatchError {
    /// True when the caller may retry the same call later.
    #[must_use]
    pub const fn is_backpressure(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }
}

pub type BatchResult<T> = Result<T, BatchError>;
