//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the key pair is missing there, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Batch settings left at zero or unset fall back to their defaults.
//!
//! ## Environment Variables
//! - `TRACEBATCH_PUBLIC_KEY`: Public key (required)
//! - `TRACEBATCH_SECRET_KEY`: Secret key (required)
//! - `TRACEBATCH_BASE_URL`: Ingestion host
//! - `TRACEBATCH_REQUEST_TIMEOUT_MS`: HTTP request timeout
//! - `TRACEBATCH_MAX_BATCH_SIZE`: Events per batch
//! - `TRACEBATCH_FLUSH_INTERVAL_MS`: Period of the time-based flush
//! - `TRACEBATCH_MAX_RETRIES`: Retries after the first attempt
//! - `TRACEBATCH_RETRY_DELAY_MS`: Initial retry backoff
//! - `TRACEBATCH_QUEUE_SIZE`: Event queue capacity
//! - `TRACEBATCH_SHUTDOWN_TIMEOUT_MS`: Drain budget on stop
//! - `TRACEBATCH_ATTEMPT_TIMEOUT_MS`: Budget for one delivery attempt
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tracebatch.json` or `./tracebatch.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracebatch_domain::constants::ENV_PREFIX;
use tracebatch_domain::{BatchConfig, ClientConfig, Config, DomainError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `DomainError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from the process environment
///
/// # Errors
/// Returns `DomainError::Config` if a key is missing or a numeric variable
/// does not parse.
pub fn load_from_env() -> Result<Config> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable source
///
/// `lookup` receives full variable names such as `TRACEBATCH_PUBLIC_KEY`.
///
/// # Errors
/// Same as [`load_from_env`].
pub fn load_from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = EnvVars { lookup };

    let mut client = ClientConfig::new(vars.required("PUBLIC_KEY")?, vars.required("SECRET_KEY")?);
    if let Some(base_url) = vars.optional("BASE_URL") {
        client.base_url = base_url;
    }
    if let Some(timeout) = vars.millis("REQUEST_TIMEOUT_MS")? {
        client.request_timeout = timeout;
    }

    let defaults = BatchConfig::default();
    let batch = BatchConfig {
        max_batch_size: vars.parsed("MAX_BATCH_SIZE")?.unwrap_or(defaults.max_batch_size),
        flush_interval: vars.millis("FLUSH_INTERVAL_MS")?.unwrap_or(defaults.flush_interval),
        max_retries: vars.parsed("MAX_RETRIES")?.unwrap_or(defaults.max_retries),
        retry_delay: vars.millis("RETRY_DELAY_MS")?.unwrap_or(defaults.retry_delay),
        queue_size: vars.parsed("QUEUE_SIZE")?.unwrap_or(defaults.queue_size),
        shutdown_timeout: vars
            .millis("SHUTDOWN_TIMEOUT_MS")?
            .unwrap_or(defaults.shutdown_timeout),
        attempt_timeout: vars.millis("ATTEMPT_TIMEOUT_MS")?.unwrap_or(defaults.attempt_timeout),
    };

    finish(Config { client, batch })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `DomainError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DomainError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DomainError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DomainError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`); files without
/// an extension are read as JSON.
///
/// # Errors
/// Returns `DomainError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let config: Config = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DomainError::Config(format!("Invalid TOML format: {e}")))?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| DomainError::Config(format!("Invalid JSON format: {e}")))?,
        _ => {
            return Err(DomainError::Config(format!("Unsupported config format: {extension}")))
        }
    };

    finish(config)
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 6] {
    [
        dir.join("tracebatch.json"),
        dir.join("tracebatch.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
    ]
}

fn finish(mut config: Config) -> Result<Config> {
    config.client.validate()?;
    config.batch = config.batch.normalized();
    config.batch.validate()?;
    Ok(config)
}

struct EnvVars<F> {
    lookup: F,
}

impl<F> EnvVars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, suffix: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{suffix}")).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, suffix: &str) -> Result<String> {
        self.optional(suffix).ok_or_else(|| {
            DomainError::Config(format!(
                "Missing required environment variable: {ENV_PREFIX}{suffix}"
            ))
        })
    }

    fn parsed<T>(&self, suffix: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(suffix)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    DomainError::Config(format!("Invalid value for {ENV_PREFIX}{suffix}: {e}"))
                })
            })
            .transpose()
    }

    fn millis(&self, suffix: &str) -> Result<Option<Duration>> {
        Ok(self.parsed::<u64>(suffix)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_load_from_lookup_minimal() {
        let config = load_from_lookup(lookup(&[
            ("TRACEBATCH_PUBLIC_KEY", "pk"),
            ("TRACEBATCH_SECRET_KEY", "sk"),
        ]))
        .unwrap();

        assert_eq!(config.client.public_key, "pk");
        assert_eq!(config.client.base_url, "https://cloud.langfuse.com");
        assert_eq!(config.batch, BatchConfig::default());
    }

    #[test]
    fn test_load_from_lookup_all_vars_set() {
        let config = load_from_lookup(lookup(&[
            ("TRACEBATCH_PUBLIC_KEY", "pk"),
            ("TRACEBATCH_SECRET_KEY", "sk"),
            ("TRACEBATCH_BASE_URL", "http://localhost:3000"),
            ("TRACEBATCH_REQUEST_TIMEOUT_MS", "2500"),
            ("TRACEBATCH_MAX_BATCH_SIZE", "25"),
            ("TRACEBATCH_FLUSH_INTERVAL_MS", "1000"),
            ("TRACEBATCH_MAX_RETRIES", "5"),
            ("TRACEBATCH_RETRY_DELAY_MS", "200"),
            ("TRACEBATCH_QUEUE_SIZE", "500"),
            ("TRACEBATCH_SHUTDOWN_TIMEOUT_MS", "3000"),
            ("TRACEBATCH_ATTEMPT_TIMEOUT_MS", "750"),
        ]))
        .unwrap();

        assert_eq!(config.client.base_url, "http://localhost:3000");
        assert_eq!(config.client.request_timeout, Duration::from_millis(2500));
        assert_eq!(
            config.batch,
            BatchConfig {
                max_batch_size: 25,
                flush_interval: Duration::from_secs(1),
                max_retries: 5,
                retry_delay: Duration::from_millis(200),
                queue_size: 500,
                shutdown_timeout: Duration::from_secs(3),
                attempt_timeout: Duration::from_millis(750),
            }
        );
    }

    #[test]
    fn test_load_from_lookup_missing_key() {
        let err = load_from_lookup(lookup(&[("TRACEBATCH_PUBLIC_KEY", "pk")])).unwrap_err();
        assert_eq!(
            err,
            DomainError::Config(
                "Missing required environment variable: TRACEBATCH_SECRET_KEY".to_string()
            )
        );
    }

    #[test]
    fn test_load_from_lookup_invalid_number() {
        let result = load_from_lookup(lookup(&[
            ("TRACEBATCH_PUBLIC_KEY", "pk"),
            ("TRACEBATCH_SECRET_KEY", "sk"),
            ("TRACEBATCH_QUEUE_SIZE", "lots"),
        ]));
        assert!(matches!(result, Err(DomainError::Config(msg)) if msg.contains("QUEUE_SIZE")));
    }

    #[test]
    fn test_load_from_lookup_rejects_oversized_batch() {
        let result = load_from_lookup(lookup(&[
            ("TRACEBATCH_PUBLIC_KEY", "pk"),
            ("TRACEBATCH_SECRET_KEY", "sk"),
            ("TRACEBATCH_MAX_BATCH_SIZE", "9223372036854775807"),
        ]));
        assert!(matches!(result, Err(DomainError::Config(msg)) if msg.contains("max_batch_size")));
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let config = load_from_lookup(lookup(&[
            ("TRACEBATCH_PUBLIC_KEY", "pk"),
            ("TRACEBATCH_SECRET_KEY", "sk"),
            ("TRACEBATCH_MAX_RETRIES", "0"),
            ("TRACEBATCH_FLUSH_INTERVAL_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.batch.max_retries, 3);
        assert_eq!(config.batch.flush_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_config_toml() {
        let contents = r#"
            [client]
            public_key = "pk"
            secret_key = "sk"

            [batch]
            max_batch_size = 10
            flush_interval_ms = 500
        "#;

        let config = parse_config(contents, Path::new("tracebatch.toml")).unwrap();
        assert_eq!(config.batch.max_batch_size, 10);
        assert_eq!(config.batch.flush_interval, Duration::from_millis(500));
        assert_eq!(config.batch.queue_size, 10_000);
    }

    #[test]
    fn test_parse_config_rejects_unknown_extension() {
        let result = parse_config("", Path::new("config.yaml"));
        assert!(matches!(result, Err(DomainError::Config(msg)) if msg.contains("yaml")));
    }

    #[test]
    fn test_parse_config_requires_keys() {
        let contents = r#"{"client": {"public_key": "", "secret_key": "sk"}}"#;
        assert!(parse_config(contents, Path::new("config.json")).is_err());
    }
}
