//! Application constants
//!
//! Centralized location for the defaults and identifiers shared by the
//! batch processor, the transport and the configuration loader.

use std::time::Duration;

// SDK identity sent with every ingestion request
pub const SDK_NAME: &str = "tracebatch-rs";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

// Transport defaults
pub const DEFAULT_BASE_URL: &str = "https://cloud.langfuse.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Batch processor defaults
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_QUEUE_SIZE: usize = 10_000;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

// Batch processor limits
pub const MAX_BATCH_SIZE: usize = 100_000;
pub const MAX_QUEUE_SIZE: usize = 10_000_000;

// Environment variable prefix for the configuration loader
pub const ENV_PREFIX: &str = "TRACEBATCH_";
