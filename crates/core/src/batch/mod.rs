//! Batch delivery ports
//!
//! This module provides the seams between the batch processor and the outside
//! world: the transport that sends a batch, and the observer that hears about
//! batches which could not be delivered.

pub mod ports;

pub use ports::{BatchSender, ErrorObserver, TracingErrorObserver};
