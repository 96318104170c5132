//! HTTP source for the live activity feed.

use std::time::Duration;

use async_trait::async_trait;
use folio_scheduler::SharedClock;
use reqwest::{Client, Url};

use crate::activity::{Activity, ActivityFeedBody, ActivityQuery, newest_first};
use crate::error::{FetchConfigError, FetchError, FetchResult};
use crate::fetcher::{CachedFetcher, FetcherConfig, RemoteSource};

/// Activity feed fetcher with caching and retries.
pub type ActivityFeed = CachedFetcher<ActivityFeedClient>;

/// Calls `GET {base_url}/activities?limit=N`.
///
/// The body may be `{"activities": [...]}` or a bare array. Results are
/// sorted newest first and truncated to the requested limit.
#[derive(Debug, Clone)]
pub struct ActivityFeedClient {
    client: Client,
    endpoint: Url,
}

impl ActivityFeedClient {
    /// Create a client for the feed under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid URL or when the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchConfigError> {
        let endpoint = format!("{}/activities", base_url.trim_end_matches('/'));
        let endpoint =
            Url::parse(&endpoint).map_err(|err| FetchConfigError::invalid_base_url(base_url, err))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("folio-activity/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchConfigError::Client(err.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Wrap the client in a [`CachedFetcher`].
    ///
    /// # Errors
    ///
    /// Returns an error when the fetcher configuration is invalid.
    pub fn into_feed(
        self,
        config: FetcherConfig,
        clock: SharedClock,
    ) -> Result<ActivityFeed, FetchConfigError> {
        CachedFetcher::new(self, config, clock)
    }
}

#[async_trait]
impl RemoteSource for ActivityFeedClient {
    type Params = ActivityQuery;
    type Output = Vec<Activity>;

    async fn fetch(&self, params: &ActivityQuery) -> FetchResult<Vec<Activity>> {
        tracing::debug!(endpoint = %self.endpoint, limit = params.limit, "Fetching activity feed");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("limit", params.limit)])
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        let body: ActivityFeedBody = serde_json::from_slice(&bytes).map_err(FetchError::decode)?;
        Ok(body.into_activities())
    }

    fn shape(&self, params: &ActivityQuery, output: Vec<Activity>) -> Vec<Activity> {
        newest_first(output, params.limit)
    }

    fn name(&self) -> &'static str {
        "activity-feed"
    }
}
