use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracebatch_core::BatchSender;
use tracebatch_domain::constants::{SDK_NAME, SDK_VERSION};
use tracebatch_domain::{ClientConfig, DeliveryError, DomainError, TelemetryEvent};
use tracing::{debug, instrument, warn};
use url::Url;

/// Path of the batch ingestion endpoint, relative to the base URL.
const INGESTION_PATH: [&str; 3] = ["api", "public", "ingestion"];

/// Transport posting batches to the ingestion endpoint.
///
/// Each call is one HTTP request authenticated with the key pair (basic
/// auth). 200, 201 and 207 count as delivered; entries rejected inside a 207
/// response are logged and not retried.
#[derive(Clone)]
pub struct HttpBatchSender {
    client: ReqwestClient,
    ingestion_url: Url,
    public_key: String,
    secret_key: String,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct IngestionRequest<'a> {
    batch: &'a [TelemetryEvent],
    metadata: IngestionMetadata,
}

#[derive(Serialize)]
struct IngestionMetadata {
    sdk_name: &'static str,
    sdk_version: &'static str,
}

/// Body of a 207 response.
#[derive(Debug, Default, Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    successes: Vec<Value>,
    #[serde(default)]
    errors: Vec<Value>,
}

impl HttpBatchSender {
    /// Build a sender for the endpoint and key pair in `config`.
    ///
    /// # Errors
    /// Returns `DomainError::Config` for missing keys, an unusable base URL,
    /// or when the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let client = ReqwestClient::builder()
            .timeout(config.request_timeout)
            .user_agent(format!("{SDK_NAME}/{SDK_VERSION}"))
            .build()
            .map_err(|err| DomainError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            ingestion_url: ingestion_url(&config.base_url)?,
            public_key: config.public_key.clone(),
            secret_key: config.secret_key.clone(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn ingestion_url(&self) -> &Url {
        &self.ingestion_url
    }

    fn map_request_error(&self, err: &reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::Timeout(self.request_timeout)
        } else {
            DeliveryError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl BatchSender for HttpBatchSender {
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn send_batch(&self, batch: &[TelemetryEvent]) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(&IngestionRequest {
            batch,
            metadata: IngestionMetadata { sdk_name: SDK_NAME, sdk_version: SDK_VERSION },
        })
        .map_err(|err| DeliveryError::Serialization(err.to_string()))?;

        let response = self
            .client
            .post(self.ingestion_url.clone())
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| {
                debug!(error = %err, "Ingestion request failed");
                self.map_request_error(&err)
            })?;

        let status = response.status();
        // A body that cannot be read is treated as empty.
        let text = response.text().await.unwrap_or_default();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                debug!(%status, "Batch accepted");
                Ok(())
            }
            StatusCode::MULTI_STATUS => {
                log_partial_failures(&text);
                Ok(())
            }
            _ => Err(DeliveryError::api(status.as_u16(), text)),
        }
    }
}

impl fmt::Debug for HttpBatchSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBatchSender")
            .field("ingestion_url", &self.ingestion_url.as_str())
            .field("public_key", &self.public_key)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn ingestion_url(base_url: &str) -> Result<Url, DomainError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|err| DomainError::Config(format!("invalid base URL {base_url:?}: {err}")))?;
    url.path_segments_mut()
        .map_err(|()| DomainError::Config(format!("base URL cannot carry a path: {base_url}")))?
        .pop_if_empty()
        .extend(INGESTION_PATH);
    Ok(url)
}

fn log_partial_failures(body: &str) {
    let response: IngestionResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, "Unparseable multi-status body");
            IngestionResponse::default()
        }
    };

    if response.errors.is_empty() {
        debug!(successes = response.successes.len(), "Batch accepted");
        return;
    }

    warn!(
        successes = response.successes.len(),
        errors = response.errors.len(),
        "Batch partially rejected"
    );
    for rejected in rejected_events(&response) {
        warn!(
            event_id = rejected.event_id,
            status = rejected.status,
            message = rejected.message,
            "Event rejected by ingestion endpoint"
        );
    }
}

/// Per-event error reported in a multi-status response
#[derive(Debug, PartialEq, Eq)]
struct RejectedEvent<'a> {
    event_id: &'a str,
    status: Option<u64>,
    message: &'a str,
}

fn rejected_events(response: &IngestionResponse) -> impl Iterator<Item = RejectedEvent<'_>> {
    response.errors.iter().map(|error| RejectedEvent {
        event_id: error.get("id").and_then(Value::as_str).unwrap_or_default(),
        status: error.get("status").and_then(Value::as_u64),
        message: error.get("message").and_then(Value::as_str).unwrap_or_default(),
    })
}
