//! # tracebatch Infrastructure
//!
//! Runtime implementations of the core batch ports.
//!
//! This crate contains:
//! - The asynchronous batch processor and its flush loop
//! - The HTTP ingestion transport
//! - The [`TelemetryClient`] facade and its observation handles
//! - Configuration loading from environment and files
//!
//! ## Architecture
//! - Implements traits defined in `tracebatch-core`
//! - Contains all "impure" code (tasks, timers, network I/O)

pub mod batch;
pub mod client;
pub mod config;
pub mod http;
pub mod observation;

// Re-export commonly used items
pub use batch::{BatchError, BatchProcessor, BatchResult, ProcessorState};
pub use client::TelemetryClient;
pub use http::HttpBatchSender;
pub use observation::{Observation, ObservationUpdate};
