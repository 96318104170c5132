//! Error types for the analytics pipeline.

use folio_scheduler::SchedulerError;
use thiserror::Error;

/// Failure delivering one batch. Batches are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or timed out.
    #[error("Analytics request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("Analytics endpoint returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The batch could not be encoded.
    #[error("Failed to encode analytics batch: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
            },
            None => Self::Request(err.to_string()),
        }
    }
}

/// Configuration and construction errors for analytics components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    /// Batches must hold at least one event.
    #[error("Batch size must be greater than 0")]
    ZeroBatchSize,

    /// A timer was configured with a zero period.
    #[error("{0} must be greater than 0 ms")]
    ZeroInterval(&'static str),

    /// The endpoint URL is not a valid absolute URL.
    #[error("Invalid analytics endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// Rejected URL.
        url: String,
        /// Parse failure.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// The flush timer could not be scheduled.
    #[error("Failed to schedule flush timer: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl AnalyticsError {
    /// Create an invalid endpoint error.
    #[must_use]
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for analytics construction.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Status { status: 503 };
        assert!(err.to_string().contains("503"));

        let err = AnalyticsError::invalid_endpoint("nope", "relative URL without a base");
        assert!(err.to_string().contains("nope"));

        let err = AnalyticsError::ZeroInterval("Flush interval");
        assert!(err.to_string().contains("Flush interval"));
    }
}
