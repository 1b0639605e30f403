//! Delivery errors and outcome classification
//!
//! A transport reports failures as [`DeliveryError`]. The batch processor only
//! cares whether a failure may be retried, which [`DeliveryOutcome`] captures:
//! any 4xx response other than 429 is terminal, everything else (network
//! failures, timeouts, rate limits, server errors) is transient.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by a batch transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The backend answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String, body: String },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The attempt did not finish within its time budget.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The batch could not be encoded for the wire.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DeliveryError {
    /// Build an API error from a status code and response body.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api { status, message: "batch request failed".to_string(), body: body.into() }
    }

    /// HTTP status carried by the error, if any.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Terminal errors must not be retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status) && status != 429)
    }
}

/// Classified result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Terminal(DeliveryError),
    Transient(DeliveryError),
}

impl DeliveryOutcome {
    /// Classify a transport result.
    pub fn classify(result: Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(err) if err.is_terminal() => Self::Terminal(err),
            Err(err) => Self::Transient(err),
        }
    }

    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Consume the outcome, returning the error for failed attempts.
    pub fn into_error(self) -> Option<DeliveryError> {
        match self {
            Self::Delivered => None,
            Self::Terminal(err) | Self::Transient(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_terminal() {
        for status in [400, 401, 403, 404, 413, 422] {
            assert!(DeliveryError::api(status, "").is_terminal(), "status {status}");
        }
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        assert!(!DeliveryError::api(429, "slow down").is_terminal());
        assert!(!DeliveryError::api(500, "").is_terminal());
        assert!(!DeliveryError::api(503, "").is_terminal());
        assert!(!DeliveryError::Network("connection reset".into()).is_terminal());
        assert!(!DeliveryError::Timeout(Duration::from_secs(1)).is_terminal());
    }

    #[test]
    fn test_classify() {
        assert_eq!(DeliveryOutcome::classify(Ok(())), DeliveryOutcome::Delivered);
        assert!(matches!(
            DeliveryOutcome::classify(Err(DeliveryError::api(400, "bad"))),
            DeliveryOutcome::Terminal(_)
        ));
        assert!(matches!(
            DeliveryOutcome::classify(Err(DeliveryError::api(429, ""))),
            DeliveryOutcome::Transient(_)
        ));
    }

    #[test]
    fn test_into_error() {
        assert_eq!(DeliveryOutcome::Delivered.into_error(), None);
        let err = DeliveryError::Network("down".into());
        assert_eq!(DeliveryOutcome::Transient(err.clone()).into_error(), Some(err));
    }

    #[test]
    fn test_display_includes_status() {
        let err = DeliveryError::api(503, "unavailable");
        assert_eq!(err.to_string(), "API error (status 503): batch request failed");
        assert_eq!(err.status(), Some(503));
    }
}
