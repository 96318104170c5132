//! Tracking facade in front of the batcher.
//!
//! Call sites describe what happened; the tracker stamps the event, applies
//! per-type rate limiting and queues it. Web vitals are limited per vital
//! name. Payload fields per helper:
//!
//! | Helper | Required | Optional |
//! |---|---|---|
//! | `page_view` | `path` | `title` |
//! | `project_view` | `projectId` | `source` |
//! | `contact_submitted` | `success` | `error` |
//! | `performance_alert` | `alertId`, `kind`, `severity`, `value`, `threshold` | |
//! | `quality_changed` | `from`, `to`, `meanFps`, `forced` | |
//! | `web_vital` | `name`, `value` | |

use std::sync::Arc;

use folio_perf::{PerformanceAlert, TierChange};
use folio_scheduler::SharedClock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batcher::EventBatcher;
use crate::error::AnalyticsResult;
use crate::event::{EventPayload, TelemetryEvent, event_types};
use crate::rate_limiter::{KeyedRateLimiter, RateLimitConfig, RateLimiterStats};

/// Tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// When false every call is a no-op.
    pub enabled: bool,
    pub rate_limit: RateLimitConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_limit: RateLimitConfig::default()
                .with_exempt_type(event_types::CONTACT_SUBMITTED)
                .with_exempt_type(event_types::PERFORMANCE_ALERT)
                .with_exempt_type(event_types::QUALITY_CHANGED),
        }
    }
}

impl TrackerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the rate limit is invalid.
    pub fn validate(&self) -> AnalyticsResult<()> {
        self.rate_limit.validate()
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// What happened to a tracked event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Queued for the next batch.
    Queued,
    /// Dropped by the per-type rate limit.
    RateLimited,
    /// Tracking is disabled.
    Disabled,
    /// The batcher has been disposed.
    Closed,
}

impl TrackOutcome {
    pub fn is_queued(self) -> bool {
        self == Self::Queued
    }
}

/// Stamps, rate-limits and queues analytics events.
#[derive(Debug)]
pub struct AnalyticsTracker {
    config: TrackerConfig,
    batcher: Arc<EventBatcher>,
    limiter: Mutex<KeyedRateLimiter>,
    clock: SharedClock,
}

impl AnalyticsTracker {
    /// Create a tracker feeding `batcher`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn new(
        config: TrackerConfig,
        batcher: Arc<EventBatcher>,
        clock: SharedClock,
    ) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self {
            limiter: Mutex::new(KeyedRateLimiter::new(config.rate_limit.clone())?),
            config,
            batcher,
            clock,
        })
    }

    /// Track an event with an arbitrary payload.
    pub fn track(&self, event_type: &str, payload: EventPayload) -> TrackOutcome {
        self.track_keyed(event_type, event_type, payload)
    }

    fn track_keyed(
        &self,
        event_type: &str,
        limit_key: &str,
        payload: EventPayload,
    ) -> TrackOutcome {
        if !self.config.enabled {
            return TrackOutcome::Disabled;
        }

        let now_ms = self.clock.now_ms();
        if !self.limiter.lock().should_process_key(event_type, limit_key, now_ms) {
            metrics::counter!("folio_events_rate_limited_total").increment(1);
            tracing::trace!(event_type, limit_key, "Event rate limited");
            return TrackOutcome::RateLimited;
        }

        if self.batcher.enqueue(TelemetryEvent::new(event_type, payload, now_ms)) {
            TrackOutcome::Queued
        } else {
            TrackOutcome::Closed
        }
    }

    pub fn page_view(&self, path: &str, title: Option<&str>) -> TrackOutcome {
        let mut payload = fields([("path", Value::from(path))]);
        insert_opt(&mut payload, "title", title);
        self.track(event_types::PAGE_VIEW, payload)
    }

    pub fn project_view(&self, project_id: &str, source: Option<&str>) -> TrackOutcome {
        let mut payload = fields([("projectId", Value::from(project_id))]);
        insert_opt(&mut payload, "source", source);
        self.track(event_types::PROJECT_VIEW, payload)
    }

    pub fn contact_submitted(&self, success: bool, error: Option<&str>) -> TrackOutcome {
        let mut payload = fields([("success", Value::from(success))]);
        insert_opt(&mut payload, "error", error);
        self.track(event_types::CONTACT_SUBMITTED, payload)
    }

    pub fn performance_alert(&self, alert: &PerformanceAlert) -> TrackOutcome {
        let payload = fields([
            ("alertId", Value::from(alert.id().to_string())),
            ("kind", Value::from(alert.kind().as_str())),
            ("severity", Value::from(alert.severity().as_str())),
            ("value", Value::from(alert.measured_value())),
            ("threshold", Value::from(alert.threshold())),
        ]);
        self.track(event_types::PERFORMANCE_ALERT, payload)
    }

    pub fn quality_changed(&self, change: &TierChange) -> TrackOutcome {
        let payload = fields([
            ("from", Value::from(change.from.as_str())),
            ("to", Value::from(change.to.as_str())),
            ("meanFps", Value::from(change.mean_fps)),
            ("forced", Value::from(change.forced)),
        ]);
        self.track(event_types::QUALITY_CHANGED, payload)
    }

    /// Track a web vital measurement such as `LCP` or `CLS`.
    pub fn web_vital(&self, name: &str, value: f64) -> TrackOutcome {
        let payload = fields([("name", Value::from(name)), ("value", Value::from(value))]);
        let limit_key = format!("{}:{name}", event_types::WEB_VITAL);
        self.track_keyed(event_types::WEB_VITAL, &limit_key, payload)
    }

    /// Rate limiter stats summed over every event type.
    pub fn rate_limit_stats(&self) -> RateLimiterStats {
        self.limiter.lock().total_stats()
    }

    pub fn batcher(&self) -> &Arc<EventBatcher> {
        &self.batcher
    }
}

fn fields<const N: usize>(entries: [(&str, Value); N]) -> EventPayload {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn insert_opt(payload: &mut EventPayload, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        payload.insert(key.to_string(), Value::from(value));
    }
}
