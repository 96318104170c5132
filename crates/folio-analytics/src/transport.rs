//! Delivery of event batches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::{AnalyticsError, AnalyticsResult, TransportError};
use crate::event::{BatchBody, TelemetryEvent};

/// Default request timeout for [`HttpTransport`].
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for flushed batches.
///
/// Called once per non-empty flush with the whole batch. Delivery is best
/// effort: the batcher logs failures and never retries.
#[async_trait]
pub trait AnalyticsTransport: Send + Sync {
    /// Deliver one batch.
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), TransportError>;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn AnalyticsTransport>;

/// Posts batches as `{"events": [...]}` JSON.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid URL or when the HTTP client cannot be
    /// built.
    pub fn new(endpoint: &str, timeout: Duration) -> AnalyticsResult<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|err| AnalyticsError::invalid_endpoint(endpoint, err))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("folio-analytics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AnalyticsError::Client(err.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AnalyticsTransport for HttpTransport {
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), TransportError> {
        let body = BatchBody { events: &batch };
        self.client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(
            endpoint = %self.endpoint,
            events = batch.len(),
            "Analytics batch delivered"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Writes batches to the log. Used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl AnalyticsTransport for LogTransport {
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), TransportError> {
        for event in &batch {
            let payload = serde_json::to_string(event.payload())
                .map_err(|err| TransportError::Encode(err.to_string()))?;
            tracing::info!(
                event_type = event.event_type(),
                enqueued_at_ms = event.enqueued_at_ms(),
                payload = %payload,
                "Analytics event"
            );
        }
        tracing::debug!(events = batch.len(), "Analytics batch logged");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = HttpTransport::new("not a url", DEFAULT_TRANSPORT_TIMEOUT);
        assert!(matches!(
            result,
            Err(AnalyticsError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_log_transport_accepts_batches() -> TestResult {
        let batch = vec![TelemetryEvent::new("page_view", EventPayload::new(), 1)];
        LogTransport.send(batch).await?;
        assert_eq!(LogTransport.name(), "log");
        Ok(())
    }
}
