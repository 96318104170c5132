//! Cache-backed remote fetching with timeout, retries and backoff.
//!
//! [`CachedFetcher::get`] is advisory: it never returns `Err` and never
//! panics. A fresh cache entry is served without I/O; otherwise the source is
//! called under a timeout and retried with backoff until the attempt budget
//! is spent, after which the outcome carries an empty value and the last
//! failure reason.
//!
//! Per key the fetcher moves through `Idle -> Fetching -> Success | Failed`.
//! Concurrent calls for one key may each fetch; the cache keeps whichever
//! result completed last.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use folio_scheduler::{BackoffStrategy, SharedClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, TtlCache, cache_key};
use crate::error::{FetchConfigError, FetchError, FetchResult};

/// Default freshness window for cached results.
pub const DEFAULT_TTL_MS: u64 = 30_000;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default number of attempts, the first one included.
pub const DEFAULT_RETRIES: u32 = 3;

/// A remote collaborator the fetcher can call.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Request parameters. Their JSON form is the cache key.
    type Params: Serialize + Send + Sync;

    /// Result value. `Default` is what callers get after total failure.
    type Output: Clone + Default + Send + Sync;

    /// Perform one attempt.
    async fn fetch(&self, params: &Self::Params) -> FetchResult<Self::Output>;

    /// Post-process a successful result before it is cached.
    fn shape(&self, _params: &Self::Params, output: Self::Output) -> Self::Output {
        output
    }

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "remote"
    }
}

/// Fetcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// How long a cached result stays fresh.
    pub ttl_ms: u64,
    /// Timeout of a single attempt.
    pub timeout_ms: u64,
    /// Total attempts per `get`, the first one included.
    pub retries: u32,
    /// Delay between attempts.
    pub backoff: BackoffStrategy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
            backoff: BackoffStrategy::default(),
        }
    }
}

impl FetcherConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for zero retries, TTL or timeout.
    pub fn validate(&self) -> Result<(), FetchConfigError> {
        if self.retries == 0 {
            return Err(FetchConfigError::ZeroRetries);
        }
        if self.ttl_ms == 0 {
            return Err(FetchConfigError::ZeroTtl);
        }
        if self.timeout_ms == 0 {
            return Err(FetchConfigError::ZeroTimeout);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where a key is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchState {
    /// Never requested.
    #[default]
    Idle,
    /// An attempt or backoff wait is in progress.
    Fetching,
    /// The last fetch succeeded.
    Success,
    /// The last fetch spent every attempt.
    Failed,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of [`CachedFetcher::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome<T> {
    /// Fetched or cached data. Empty after failure.
    pub data: T,
    /// Reason of the last failed attempt when every attempt failed.
    pub error: Option<String>,
    /// True when served from a fresh cache entry.
    pub from_cache: bool,
    /// Attempts made by this call. Zero for a cache hit.
    pub attempts: u32,
}

impl<T> FetchOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Remote fetcher fronted by a TTL cache.
pub struct CachedFetcher<S: RemoteSource> {
    source: S,
    config: FetcherConfig,
    cache: Mutex<TtlCache<S::Output>>,
    states: Mutex<HashMap<String, FetchState>>,
    clock: SharedClock,
}

impl<S: RemoteSource> CachedFetcher<S> {
    /// Create a fetcher over `source`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn new(
        source: S,
        config: FetcherConfig,
        clock: SharedClock,
    ) -> Result<Self, FetchConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            cache: Mutex::new(TtlCache::new(config.ttl_ms)),
            states: Mutex::new(HashMap::new()),
            config,
            clock,
        })
    }

    /// Fetch `params`, serving a fresh cache entry when there is one.
    pub async fn get(&self, params: &S::Params) -> FetchOutcome<S::Output> {
        let key = match cache_key(params) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(
                    source = self.source.name(),
                    error = %err,
                    "Unusable fetch parameters"
                );
                return failed(err.to_string(), 0);
            }
        };

        let cached = self
            .cache
            .lock()
            .get_fresh(&key, self.clock.now_ms())
            .map(|entry| entry.data.clone());
        if let Some(data) = cached {
            metrics::counter!("folio_fetch_cache_hits_total").increment(1);
            tracing::trace!(source = self.source.name(), key = %key, "Cache hit");
            return FetchOutcome {
                data,
                error: None,
                from_cache: true,
                attempts: 0,
            };
        }

        self.set_state(&key, FetchState::Fetching);
        let mut attempts = 0_u32;
        let mut last_error = FetchError::Request("no attempt made".to_string());

        while attempts < self.config.retries {
            if attempts > 0 {
                let delay = self.config.backoff.delay_for(attempts.saturating_sub(1));
                tracing::debug!(
                    source = self.source.name(),
                    attempt = attempts.saturating_add(1),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %last_error,
                    "Retrying fetch"
                );
                tokio::time::sleep(delay).await;
            }
            attempts = attempts.saturating_add(1);
            metrics::counter!("folio_fetch_attempts_total").increment(1);

            match self.attempt(params).await {
                Ok(output) => {
                    let data = self.source.shape(params, output);
                    let fetched_at_ms = self.clock.now_ms();
                    self.cache
                        .lock()
                        .insert(key.clone(), CacheEntry::new(data.clone(), fetched_at_ms));
                    self.set_state(&key, FetchState::Success);
                    return FetchOutcome {
                        data,
                        error: None,
                        from_cache: false,
                        attempts,
                    };
                }
                Err(err) => last_error = err,
            }
        }

        self.set_state(&key, FetchState::Failed);
        tracing::warn!(
            source = self.source.name(),
            attempts,
            error = %last_error,
            "Fetch failed after all attempts"
        );
        failed(last_error.to_string(), attempts)
    }

    async fn attempt(&self, params: &S::Params) -> FetchResult<S::Output> {
        match tokio::time::timeout(self.config.timeout(), self.source.fetch(params)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(FetchError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }

    fn set_state(&self, key: &str, state: FetchState) {
        self.states.lock().insert(key.to_string(), state);
    }

    /// Lifecycle state for `params`. Unknown keys are `Idle`.
    pub fn state(&self, params: &S::Params) -> FetchState {
        cache_key(params)
            .ok()
            .and_then(|key| self.states.lock().get(&key).copied())
            .unwrap_or_default()
    }

    /// Drop the cached entry for `params` so the next `get` fetches.
    pub fn invalidate(&self, params: &S::Params) -> bool {
        match cache_key(params) {
            Ok(key) => self.cache.lock().remove(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached entries, expired ones included.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: RemoteSource> fmt::Debug for CachedFetcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFetcher")
            .field("source", &self.source.name())
            .field("config", &self.config)
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

fn failed<T: Default>(reason: String, attempts: u32) -> FetchOutcome<T> {
    FetchOutcome {
        data: T::default(),
        error: Some(reason),
        from_cache: false,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert_eq!(FetcherConfig::default().validate(), Ok(()));
        assert_eq!(
            FetcherConfig::default().with_retries(0).validate(),
            Err(FetchConfigError::ZeroRetries)
        );
        assert_eq!(
            FetcherConfig::default().with_ttl_ms(0).validate(),
            Err(FetchConfigError::ZeroTtl)
        );
        assert_eq!(
            FetcherConfig::default().with_timeout_ms(0).validate(),
            Err(FetchConfigError::ZeroTimeout)
        );
    }

    #[test]
    fn test_default_backoff_schedule() {
        let config = FetcherConfig::default();
        assert_eq!(
            config.backoff.schedule(3),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ]
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(FetchState::default(), FetchState::Idle);
        assert_eq!(FetchState::Failed.to_string(), "failed");
    }
}
