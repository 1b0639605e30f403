//! Configuration structures
//!
//! Durations are carried as milliseconds on the wire so that JSON, TOML and
//! environment sources share one representation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_BASE_URL, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY,
    DEFAULT_SHUTDOWN_TIMEOUT, MAX_BATCH_SIZE, MAX_QUEUE_SIZE,
};
use crate::errors::{DomainError, Result};

/// Serialize a Duration as milliseconds (u64)
///
/// ```rust
/// use std::time::Duration;
///
/// use serde::{Deserialize, Serialize};
/// use tracebatch_domain::duration_millis;
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_millis")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Tuning for the asynchronous batch processor
///
/// Zero values mean "unset"; [`BatchConfig::normalized`] replaces them with
/// the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Batch size that triggers an immediate flush
    pub max_batch_size: usize,
    /// Period of the time-based flush
    #[serde(with = "duration_millis", rename = "flush_interval_ms")]
    pub flush_interval: Duration,
    /// Delivery attempts beyond the first
    pub max_retries: u32,
    /// Backoff before the first retry, doubled for each subsequent one
    #[serde(with = "duration_millis", rename = "retry_delay_ms")]
    pub retry_delay: Duration,
    /// Capacity of the event queue
    pub queue_size: usize,
    /// Upper bound on the drain performed by `stop`
    #[serde(with = "duration_millis", rename = "shutdown_timeout_ms")]
    pub shutdown_timeout: Duration,
    /// Upper bound on a single delivery attempt
    #[serde(with = "duration_millis", rename = "attempt_timeout_ms")]
    pub attempt_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            queue_size: DEFAULT_QUEUE_SIZE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl BatchConfig {
    /// Replace every zero field with its default.
    #[must_use]
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            max_batch_size: non_zero_or(self.max_batch_size, defaults.max_batch_size),
            flush_interval: non_zero_duration_or(self.flush_interval, defaults.flush_interval),
            max_retries: if self.max_retries == 0 {
                defaults.max_retries
            } else {
                self.max_retries
            },
            retry_delay: non_zero_duration_or(self.retry_delay, defaults.retry_delay),
            queue_size: non_zero_or(self.queue_size, defaults.queue_size),
            shutdown_timeout: non_zero_duration_or(
                self.shutdown_timeout,
                defaults.shutdown_timeout,
            ),
            attempt_timeout: non_zero_duration_or(self.attempt_timeout, defaults.attempt_timeout),
        }
    }

    /// Reject sizes the processor cannot allocate.
    ///
    /// # Errors
    /// Returns `DomainError::Config` when `max_batch_size` exceeds
    /// [`MAX_BATCH_SIZE`] or `queue_size` exceeds [`MAX_QUEUE_SIZE`].
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size > MAX_BATCH_SIZE {
            return Err(DomainError::Config(format!(
                "max_batch_size {} exceeds limit {MAX_BATCH_SIZE}",
                self.max_batch_size
            )));
        }
        if self.queue_size > MAX_QUEUE_SIZE {
            return Err(DomainError::Config(format!(
                "queue_size {} exceeds limit {MAX_QUEUE_SIZE}",
                self.queue_size
            )));
        }
        Ok(())
    }
}

const fn non_zero_or(value: usize, default: usize) -> usize {
    if value == 0 {
        default
    } else {
        value
    }
}

const fn non_zero_duration_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

/// Credentials and endpoint for the ingestion transport
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub public_key: String,
    pub secret_key: String,
    #[serde(
        with = "duration_millis",
        rename = "request_timeout_ms",
        default = "default_request_timeout"
    )]
    pub request_timeout: Duration,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl ClientConfig {
    /// Config for the default endpoint with the given key pair.
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Reject configurations the transport cannot use.
    ///
    /// # Errors
    /// Returns `DomainError::Config` when a key or the base URL is empty.
    pub fn validate(&self) -> Result<()> {
        if self.public_key.trim().is_empty() {
            return Err(DomainError::Config("public key is required".to_string()));
        }
        if self.secret_key.trim().is_empty() {
            return Err(DomainError::Config("secret key is required".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(DomainError::Config("base URL is required".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Complete configuration for a telemetry client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}
