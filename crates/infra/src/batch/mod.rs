//! Asynchronous batching of telemetry events
//!
//! - [`BatchProcessor`]: bounded queue, lifecycle and enqueue helpers
//! - flush loop: single background consumer building ordered batches
//! - [`RetryPolicy`] and [`Deliverer`]: bounded delivery attempts
//! - [`BatchMetrics`]: counters for queued, delivered and dropped events

pub mod accumulator;
pub mod deliverer;
pub mod errors;
mod flush_loop;
pub mod metrics;
pub mod processor;
pub mod retry;

pub use accumulator::Accumulator;
pub use deliverer::Deliverer;
pub use errors::{BatchError, BatchResult};
pub use flush_loop::FlushReason;
pub use metrics::{BatchMetrics, BatchMetricsSnapshot};
pub use processor::{BatchProcessor, ProcessorState};
pub use retry::{DeliveryFailure, RetryPolicy};
