//! HTTP transport for telemetry batches

pub mod client;

pub use client::HttpBatchSender;
