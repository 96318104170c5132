//! Performance monitor: sampler, classifier and alert emitter behind one
//! create/dispose lifecycle.
//!
//! The monitor owns its state exclusively. Hosts read copies through the
//! accessors or subscribe to tier changes and alerts. Subscribers are called
//! after the state lock is released, so they may call back into the monitor.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use folio_perf::prelude::*;
//! use folio_scheduler::ManualClock;
//!
//! # fn main() -> Result<(), PerfError> {
//! let clock = ManualClock::new(0);
//! let config = MonitorConfig::default().with_window_frames(1);
//! let monitor =
//!     PerformanceMonitor::create_with_clock(config, Arc::new(NoHeapProbe), clock.shared())?;
//!
//! monitor.record_frame_at(0);
//! let snapshot = monitor.record_frame_at(16);
//! assert!(snapshot.is_some());
//! assert_eq!(monitor.current_tier(), QualityTier::High);
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use folio_scheduler::{SharedClock, TaskHandle, TokioClock, spawn_task};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{Interval, MissedTickBehavior};

use crate::alerts::{AlertEmitter, AlertEmitterConfig, AlertThresholds, PerformanceAlert};
use crate::classifier::{ClassifierConfig, QualityClassifier, QualityTier, TierChange};
use crate::error::{PerfError, PerfResult};
use crate::listeners::{Listeners, SubscriptionId};
use crate::quality::{QualitySettings, resolve_quality};
use crate::report::PerformanceReport;
use crate::sampler::{FrameSampler, SamplerConfig, SharedHeapProbe};
use crate::snapshot::PerformanceSnapshot;

/// Default frame rate of the built-in frame ticker.
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

const FRAME_TASK_NAME: &str = "perf-frames";

/// Source of frame timestamps for the monitor's frame task.
///
/// Stands in for the host's animation-frame scheduler. Returning `None`
/// ends the frame task.
#[async_trait]
pub trait FrameTicker: Send {
    /// Wait for the next frame and return its timestamp in milliseconds.
    async fn next_frame(&mut self) -> Option<u64>;
}

/// Ticker firing at a fixed rate, timestamped by a clock.
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    clock: SharedClock,
    interval: Option<Interval>,
}

impl IntervalTicker {
    /// Create a ticker at `rate_hz` frames per second.
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::ZeroFrameRate`] when `rate_hz` is zero.
    pub fn new(rate_hz: u32, clock: SharedClock) -> PerfResult<Self> {
        if rate_hz == 0 {
            return Err(PerfError::ZeroFrameRate);
        }
        Ok(Self {
            period: Duration::from_secs(1) / rate_hz,
            clock,
            interval: None,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl FrameTicker for IntervalTicker {
    async fn next_frame(&mut self) -> Option<u64> {
        // Built on first use: tokio intervals need a running runtime.
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;
        Some(self.clock.now_ms())
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sampler: SamplerConfig,
    pub classifier: ClassifierConfig,
    pub alerts: AlertEmitterConfig,
    /// Rate of the built-in frame ticker used by [`PerformanceMonitor::start_default`].
    pub frame_rate_hz: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            classifier: ClassifierConfig::default(),
            alerts: AlertEmitterConfig::default(),
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
        }
    }
}

impl MonitorConfig {
    /// Validate every component configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> PerfResult<()> {
        self.sampler.validate()?;
        self.classifier.validate()?;
        self.alerts.validate()?;
        if self.frame_rate_hz == 0 {
            return Err(PerfError::ZeroFrameRate);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_window_frames(mut self, window_frames: u32) -> Self {
        self.sampler.window_frames = window_frames;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.classifier.cooldown_ms = cooldown_ms;
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.alerts.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn with_frame_rate_hz(mut self, frame_rate_hz: u32) -> Self {
        self.frame_rate_hz = frame_rate_hz;
        self
    }
}

/// What one snapshot changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotOutcome {
    pub tier_change: Option<TierChange>,
    pub alerts: Vec<PerformanceAlert>,
}

#[derive(Debug)]
struct MonitorState {
    sampler: FrameSampler,
    classifier: QualityClassifier,
    emitter: AlertEmitter,
}

#[derive(Debug)]
struct MonitorInner {
    config: MonitorConfig,
    clock: SharedClock,
    state: Mutex<MonitorState>,
    tier_listeners: Listeners<TierChange>,
    alert_listeners: Listeners<PerformanceAlert>,
    frame_task: Mutex<Option<TaskHandle>>,
    disposed: AtomicBool,
}

impl MonitorInner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn record_frame_at(&self, now_ms: u64) -> Option<PerformanceSnapshot> {
        if self.is_disposed() {
            return None;
        }
        let snapshot = self.state.lock().sampler.record_frame(now_ms)?;
        self.ingest(snapshot);
        Some(snapshot)
    }

    fn ingest(&self, snapshot: PerformanceSnapshot) -> SnapshotOutcome {
        if self.is_disposed() {
            return SnapshotOutcome::default();
        }

        let outcome = {
            let mut state = self.state.lock();
            SnapshotOutcome {
                tier_change: state.classifier.observe(snapshot),
                alerts: state.emitter.observe(&snapshot),
            }
        };

        for alert in &outcome.alerts {
            tracing::warn!(
                alert_id = %alert.id(),
                kind = %alert.kind(),
                severity = %alert.severity(),
                measured = alert.measured_value(),
                threshold = alert.threshold(),
                "{}",
                alert.message()
            );
            metrics::counter!("folio_alerts_total", "kind" => alert.kind().as_str())
                .increment(1);
            self.alert_listeners.emit(alert);
        }

        if let Some(change) = &outcome.tier_change {
            self.announce(change);
        }
        outcome
    }

    fn announce(&self, change: &TierChange) {
        tracing::info!(
            from = %change.from,
            to = %change.to,
            mean_fps = change.mean_fps,
            forced = change.forced,
            "Quality tier changed"
        );
        metrics::counter!("folio_quality_tier_changes_total").increment(1);
        self.tier_listeners.emit(change);
    }
}

/// Owns the sampling pipeline and its frame task.
#[derive(Debug)]
pub struct PerformanceMonitor {
    inner: Arc<MonitorInner>,
}

impl PerformanceMonitor {
    /// Create a monitor timed by tokio's clock.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn create(config: MonitorConfig, probe: SharedHeapProbe) -> PerfResult<Self> {
        Self::create_with_clock(config, probe, TokioClock::shared())
    }

    /// Create a monitor with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn create_with_clock(
        config: MonitorConfig,
        probe: SharedHeapProbe,
        clock: SharedClock,
    ) -> PerfResult<Self> {
        config.validate()?;
        let state = MonitorState {
            sampler: FrameSampler::new(config.sampler, probe)?,
            classifier: QualityClassifier::new(config.classifier, clock.now_ms())?,
            emitter: AlertEmitter::new(config.alerts)?,
        };

        tracing::debug!(
            window_frames = config.sampler.window_frames,
            cooldown_ms = config.classifier.cooldown_ms,
            initial_tier = %config.classifier.initial_tier,
            "Performance monitor created"
        );

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                clock,
                state: Mutex::new(state),
                tier_listeners: Listeners::new(),
                alert_listeners: Listeners::new(),
                frame_task: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Record a frame at the monitor clock's current time.
    pub fn record_frame(&self) -> Option<PerformanceSnapshot> {
        self.inner.record_frame_at(self.inner.clock.now_ms())
    }

    /// Record a frame at `now_ms`. Returns the snapshot when a window completes.
    pub fn record_frame_at(&self, now_ms: u64) -> Option<PerformanceSnapshot> {
        self.inner.record_frame_at(now_ms)
    }

    /// Feed a snapshot produced elsewhere through classification and alerting.
    pub fn ingest(&self, snapshot: PerformanceSnapshot) -> SnapshotOutcome {
        self.inner.ingest(snapshot)
    }

    /// Start the frame task driven by `ticker`.
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::Disposed`] after disposal,
    /// [`PerfError::AlreadyRunning`] if the task is active, or a scheduler
    /// error when no runtime is available.
    pub fn start<T>(&self, mut ticker: T) -> PerfResult<()>
    where
        T: FrameTicker + 'static,
    {
        if self.inner.is_disposed() {
            return Err(PerfError::Disposed);
        }

        let mut slot = self.inner.frame_task.lock();
        if slot.as_ref().is_some_and(TaskHandle::is_active) {
            return Err(PerfError::AlreadyRunning);
        }

        let weak: Weak<MonitorInner> = Arc::downgrade(&self.inner);
        let handle = spawn_task(FRAME_TASK_NAME, async move {
            while let Some(now_ms) = ticker.next_frame().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.is_disposed() {
                    break;
                }
                inner.record_frame_at(now_ms);
            }
        })?;
        *slot = Some(handle);

        tracing::info!(task = FRAME_TASK_NAME, "Performance monitor started");
        Ok(())
    }

    /// Start the frame task with an [`IntervalTicker`] at the configured rate.
    ///
    /// # Errors
    ///
    /// Same as [`PerformanceMonitor::start`].
    pub fn start_default(&self) -> PerfResult<()> {
        let ticker = IntervalTicker::new(
            self.inner.config.frame_rate_hz,
            Arc::clone(&self.inner.clock),
        )?;
        self.start(ticker)
    }

    /// Cancel the frame task. Returns true if it was running.
    pub fn stop(&self) -> bool {
        let handle = self.inner.frame_task.lock().take();
        match handle {
            Some(mut handle) => {
                let was_running = handle.cancel();
                if was_running {
                    tracing::info!(task = FRAME_TASK_NAME, "Performance monitor stopped");
                }
                was_running
            }
            None => false,
        }
    }

    /// Stop the frame task and drop every subscriber.
    ///
    /// Idempotent. No callback fires after this returns.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop();
        self.inner.tier_listeners.clear();
        self.inner.alert_listeners.clear();
        tracing::info!("Performance monitor disposed");
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .frame_task
            .lock()
            .as_ref()
            .is_some_and(TaskHandle::is_active)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    pub fn current_tier(&self) -> QualityTier {
        self.inner.state.lock().classifier.current_tier()
    }

    /// Rendering settings for the current tier.
    pub fn quality_settings(&self) -> QualitySettings {
        resolve_quality(self.current_tier())
    }

    /// Override the tier, as the host's quality toggle does.
    pub fn force_tier(&self, tier: QualityTier) -> Option<TierChange> {
        if self.inner.is_disposed() {
            return None;
        }
        let now_ms = self.inner.clock.now_ms();
        let change = self.inner.state.lock().classifier.force_tier(tier, now_ms);
        if let Some(change) = &change {
            self.inner.announce(change);
        }
        change
    }

    /// Copy of the classifier history, oldest first.
    pub fn history(&self) -> Vec<PerformanceSnapshot> {
        self.inner.state.lock().classifier.history()
    }

    pub fn mean_fps(&self) -> Option<f64> {
        self.inner.state.lock().classifier.mean_fps()
    }

    /// Copy of the recent alerts, oldest first.
    pub fn recent_alerts(&self) -> Vec<PerformanceAlert> {
        self.inner.state.lock().emitter.recent_alerts()
    }

    pub fn clear_alerts(&self) {
        self.inner.state.lock().emitter.clear_alerts();
    }

    /// Summary of the current history.
    pub fn report(&self) -> PerformanceReport {
        let now_ms = self.inner.clock.now_ms();
        let state = self.inner.state.lock();
        PerformanceReport::from_history(
            &state.classifier.history(),
            state.classifier.current_tier(),
            state.emitter.recent_len(),
            now_ms,
        )
    }

    /// Call `callback` on every tier change.
    pub fn on_tier_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&TierChange) + Send + Sync + 'static,
    {
        self.inner.tier_listeners.subscribe(callback)
    }

    /// Call `callback` on every new alert.
    pub fn on_alert<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PerformanceAlert) + Send + Sync + 'static,
    {
        self.inner.alert_listeners.subscribe(callback)
    }

    /// Remove a subscription. Returns false for unknown ids.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.tier_listeners.unsubscribe(id) || self.inner.alert_listeners.unsubscribe(id)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.inner.clock
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}
