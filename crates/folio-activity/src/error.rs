//! Error types for remote fetching.

use thiserror::Error;

/// Invalid fetcher or client configuration. Raised at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchConfigError {
    /// At least one attempt is required.
    #[error("Retries must be at least 1")]
    ZeroRetries,

    /// Cache entries would never be fresh.
    #[error("Cache TTL must be greater than 0 ms")]
    ZeroTtl,

    /// Every request would time out immediately.
    #[error("Fetch timeout must be greater than 0 ms")]
    ZeroTimeout,

    /// The base URL is not a valid absolute URL.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// Rejected URL.
        url: String,
        /// Parse failure.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchConfigError {
    /// Create an invalid base URL error.
    #[must_use]
    pub fn invalid_base_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of a single fetch attempt.
///
/// Attempts that fail are retried; callers of
/// [`CachedFetcher::get`](crate::fetcher::CachedFetcher::get) only ever see the
/// rendered message of the last one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be sent.
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("Server returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not in the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The attempt did not finish in time.
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The parameters could not be turned into a cache key.
    #[error("Invalid fetch parameters: {0}")]
    Params(String),
}

impl FetchError {
    /// Create a decode error.
    #[must_use]
    pub fn decode(reason: impl ToString) -> Self {
        Self::Decode(reason.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Result type for a single fetch attempt.
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(
            FetchError::Timeout { timeout_ms: 10_000 }
                .to_string()
                .contains("10000 ms")
        );
        assert!(FetchError::Status { status: 502 }.to_string().contains("502"));
        assert!(
            FetchConfigError::invalid_base_url("::", "relative URL without a base")
                .to_string()
                .contains("'::'")
        );
    }
}
