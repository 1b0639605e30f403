//! # tracebatch Core
//!
//! Port interfaces for the telemetry batch pipeline.
//!
//! This crate contains:
//! - The transport port ([`BatchSender`]) the processor delivers through
//! - The failure port ([`ErrorObserver`]) that hears about dropped batches
//!
//! ## Architecture Principles
//! - Only depends on `tracebatch-domain`
//! - No HTTP, runtime or platform code
//! - All external dependencies via traits

pub mod batch;

pub use batch::ports::{BatchSender, ErrorObserver, TracingErrorObserver};
