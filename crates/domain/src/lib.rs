//! # tracebatch Domain
//!
//! Domain types for the telemetry batch pipeline.
//!
//! This crate contains:
//! - Telemetry records (traces, spans, generations, events, scores)
//! - The [`TelemetryEvent`] envelope queued by the batch processor
//! - Observation kinds and trace propagation context
//! - Delivery errors and their terminal/transient classification
//! - Configuration structures and defaults
//!
//! ## Architecture
//! - No dependencies on other tracebatch crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod delivery;
pub mod errors;
pub mod ids;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::{duration_millis, BatchConfig, ClientConfig, Config};
pub use delivery::{DeliveryError, DeliveryOutcome};
pub use errors::*;
pub use ids::{new_id, observation_id, trace_id};
pub use types::*;
