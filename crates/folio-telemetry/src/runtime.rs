//! Builds and tears down the telemetry components as one unit.
//!
//! Alerts and tier changes from the monitor are forwarded into the tracker,
//! so they leave through the same batches as every other event.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use folio_activity::{ActivityFeed, ActivityFeedClient};
use folio_analytics::{AnalyticsTracker, EventBatcher, HttpTransport, LogTransport, SharedTransport};
use folio_perf::{PerformanceMonitor, SharedHeapProbe, SubscriptionId};
use folio_scheduler::SharedClock;

use crate::config::TelemetryConfig;

/// Monitor, batcher, tracker and activity feed wired together.
#[derive(Debug)]
pub struct TelemetryRuntime {
    monitor: PerformanceMonitor,
    batcher: Arc<EventBatcher>,
    tracker: Arc<AnalyticsTracker>,
    activity: Option<ActivityFeed>,
    subscriptions: Vec<SubscriptionId>,
}

impl TelemetryRuntime {
    /// Build every component from `config`.
    ///
    /// Uses [`HttpTransport`] when an analytics endpoint is configured and
    /// [`LogTransport`] otherwise. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when a component rejects its configuration.
    pub fn build(
        config: &TelemetryConfig,
        probe: SharedHeapProbe,
        clock: SharedClock,
    ) -> Result<Self> {
        let transport: SharedTransport = match &config.analytics.endpoint {
            Some(endpoint) => Arc::new(
                HttpTransport::new(
                    endpoint,
                    Duration::from_millis(config.analytics.transport_timeout_ms),
                )
                .context("Failed to create analytics transport")?,
            ),
            None => Arc::new(LogTransport),
        };
        Self::build_with_transport(config, transport, probe, clock)
    }

    /// Build with an explicit analytics transport.
    ///
    /// # Errors
    ///
    /// Returns an error when a component rejects its configuration.
    pub fn build_with_transport(
        config: &TelemetryConfig,
        transport: SharedTransport,
        probe: SharedHeapProbe,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;
        let transport_name = transport.name();

        let batcher = Arc::new(
            EventBatcher::create(config.analytics.batcher, transport)
                .context("Failed to create event batcher")?,
        );
        let tracker = Arc::new(
            AnalyticsTracker::new(
                config.analytics.tracker.clone(),
                Arc::clone(&batcher),
                Arc::clone(&clock),
            )
            .context("Failed to create analytics tracker")?,
        );
        let monitor =
            PerformanceMonitor::create_with_clock(config.monitor, probe, Arc::clone(&clock))
                .context("Failed to create performance monitor")?;

        let activity = match &config.activity.base_url {
            Some(base_url) => Some(
                ActivityFeedClient::new(base_url, config.activity.fetcher.timeout())
                    .and_then(|client| client.into_feed(config.activity.fetcher, clock))
                    .context("Failed to create activity feed")?,
            ),
            None => None,
        };

        let alert_tracker = Arc::clone(&tracker);
        let change_tracker = Arc::clone(&tracker);
        let subscriptions = vec![
            monitor.on_alert(move |alert| {
                alert_tracker.performance_alert(alert);
            }),
            monitor.on_tier_change(move |change| {
                change_tracker.quality_changed(change);
            }),
        ];

        tracing::info!(
            transport = transport_name,
            activity_feed = activity.is_some(),
            "Telemetry runtime started"
        );

        Ok(Self {
            monitor,
            batcher,
            tracker,
            activity,
            subscriptions,
        })
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn tracker(&self) -> &Arc<AnalyticsTracker> {
        &self.tracker
    }

    pub fn batcher(&self) -> &Arc<EventBatcher> {
        &self.batcher
    }

    /// The activity feed, when a base URL is configured.
    pub fn activity(&self) -> Option<&ActivityFeed> {
        self.activity.as_ref()
    }

    /// Stop sampling, then deliver the remaining analytics events.
    ///
    /// The monitor goes first so no alert is tracked after the batcher
    /// closes.
    pub async fn shutdown(&self) {
        for id in &self.subscriptions {
            self.monitor.unsubscribe(*id);
        }
        self.monitor.dispose();
        self.batcher.dispose().await;

        let stats = self.batcher.stats();
        tracing::info!(
            events_sent = stats.events_sent,
            batches_failed = stats.batches_failed,
            "Telemetry runtime stopped"
        );
    }
}
