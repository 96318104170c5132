//! Edge-triggered performance alerts.
//!
//! An alert fires when a metric crosses from within its threshold to outside
//! it between two consecutive snapshots. A metric that stays breached does
//! not fire again until it has recovered.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PerfError, PerfResult};
use crate::snapshot::PerformanceSnapshot;

/// Default number of alerts kept in the recent list.
pub const DEFAULT_RECENT_ALERTS: usize = 10;

/// Metric an alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    FrameRate,
    Memory,
    FrameTime,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FrameRate => "frame_rate",
            Self::Memory => "memory",
            Self::FrameTime => "frame_time",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity.
///
/// Cut points, monotonic in how far the metric is past its threshold:
///
/// | Kind | High | Medium |
/// |---|---|---|
/// | FrameRate | `fps <= 2/3 * min_fps` | `fps <= 5/6 * min_fps` |
/// | Memory | `heap / max >= 1.5` | `heap / max >= 1.2` |
/// | FrameTime | `frame_time / max >= 2.0` | `frame_time / max >= 1.5` |
///
/// Anything else past the threshold is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn for_frame_rate(fps: f64, min_fps: f64) -> Self {
        if fps * 3.0 <= min_fps * 2.0 {
            Self::High
        } else if fps * 6.0 <= min_fps * 5.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    fn for_ratio(ratio: f64, medium: f64, high: f64) -> Self {
        if ratio >= high {
            Self::High
        } else if ratio >= medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    id: Uuid,
    kind: AlertKind,
    severity: AlertSeverity,
    measured_value: f64,
    threshold: f64,
    fired_at_ms: u64,
}

impl PerformanceAlert {
    fn new(
        kind: AlertKind,
        severity: AlertSeverity,
        measured_value: f64,
        threshold: f64,
        fired_at_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            measured_value,
            threshold,
            fired_at_ms,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    pub fn measured_value(&self) -> f64 {
        self.measured_value
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn fired_at_ms(&self) -> u64 {
        self.fired_at_ms
    }

    /// Human-readable description for logs and overlays.
    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::FrameRate => format!(
                "Frame rate {:.1} fps is below {:.1} fps",
                self.measured_value, self.threshold
            ),
            AlertKind::Memory => format!(
                "Heap usage {:.1} MB exceeds {:.1} MB",
                self.measured_value, self.threshold
            ),
            AlertKind::FrameTime => format!(
                "Longest frame {:.1} ms exceeds {:.1} ms",
                self.measured_value, self.threshold
            ),
        }
    }
}

/// Longest single frame tolerated before a frame time alert.
pub const DEFAULT_MAX_FRAME_TIME_MS: f64 = 100.0;

/// Alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Frame rate below this is a breach.
    pub min_fps: f64,
    /// Heap usage above this is a breach.
    pub max_memory_mb: f64,
    /// A single frame longer than this is a breach.
    pub max_frame_time_ms: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_fps: 30.0,
            max_memory_mb: 500.0,
            max_frame_time_ms: DEFAULT_MAX_FRAME_TIME_MS,
        }
    }
}

impl AlertThresholds {
    /// Validate the thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::InvalidThreshold`] for any non-finite or
    /// non-positive value.
    pub fn validate(&self) -> PerfResult<()> {
        PerfError::check_threshold("min_fps", self.min_fps)?;
        PerfError::check_threshold("max_memory_mb", self.max_memory_mb)?;
        PerfError::check_threshold("max_frame_time_ms", self.max_frame_time_ms)
    }

    #[must_use]
    pub fn with_min_fps(mut self, min_fps: f64) -> Self {
        self.min_fps = min_fps;
        self
    }

    #[must_use]
    pub fn with_max_memory_mb(mut self, max_memory_mb: f64) -> Self {
        self.max_memory_mb = max_memory_mb;
        self
    }

    #[must_use]
    pub fn with_max_frame_time_ms(mut self, max_frame_time_ms: f64) -> Self {
        self.max_frame_time_ms = max_frame_time_ms;
        self
    }

    fn frame_rate_breached(&self, snapshot: &PerformanceSnapshot) -> bool {
        snapshot.fps() < self.min_fps
    }

    fn frame_time_breached(&self, snapshot: &PerformanceSnapshot) -> bool {
        snapshot.longest_frame_ms() > self.max_frame_time_ms
    }

    fn memory_breached(&self, snapshot: &PerformanceSnapshot) -> bool {
        snapshot
            .heap_reading()
            .is_some_and(|heap| heap > self.max_memory_mb)
    }
}

/// Alert emitter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertEmitterConfig {
    pub thresholds: AlertThresholds,
    /// Capacity of the recent alert list.
    pub recent_capacity: usize,
}

impl Default for AlertEmitterConfig {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            recent_capacity: DEFAULT_RECENT_ALERTS,
        }
    }
}

impl AlertEmitterConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero capacity or invalid thresholds.
    pub fn validate(&self) -> PerfResult<()> {
        if self.recent_capacity == 0 {
            return Err(PerfError::ZeroCapacity("Recent alerts"));
        }
        self.thresholds.validate()
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn with_recent_capacity(mut self, capacity: usize) -> Self {
        self.recent_capacity = capacity;
        self
    }
}

/// Compares consecutive snapshots and records threshold crossings.
#[derive(Debug, Clone)]
pub struct AlertEmitter {
    config: AlertEmitterConfig,
    previous: Option<PerformanceSnapshot>,
    recent: VecDeque<PerformanceAlert>,
    total_fired: u64,
}

impl AlertEmitter {
    /// Create an emitter.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn new(config: AlertEmitterConfig) -> PerfResult<Self> {
        config.validate()?;
        Ok(Self {
            recent: VecDeque::with_capacity(config.recent_capacity),
            config,
            previous: None,
            total_fired: 0,
        })
    }

    /// Compare `snapshot` with the previous one and return new alerts.
    ///
    /// Alerts are returned in kind order: frame rate, memory, frame time.
    pub fn observe(&mut self, snapshot: &PerformanceSnapshot) -> Vec<PerformanceAlert> {
        let thresholds = self.config.thresholds;
        let previous = self.previous.replace(*snapshot);
        let was = |breached: fn(&AlertThresholds, &PerformanceSnapshot) -> bool| {
            previous
                .as_ref()
                .is_some_and(|prev| breached(&thresholds, prev))
        };

        let mut fired = Vec::new();
        let now_ms = snapshot.captured_at_ms();

        if thresholds.frame_rate_breached(snapshot) && !was(AlertThresholds::frame_rate_breached) {
            fired.push(PerformanceAlert::new(
                AlertKind::FrameRate,
                AlertSeverity::for_frame_rate(snapshot.fps(), thresholds.min_fps),
                snapshot.fps(),
                thresholds.min_fps,
                now_ms,
            ));
        }

        if thresholds.memory_breached(snapshot) && !was(AlertThresholds::memory_breached) {
            let heap = snapshot.heap_used_mb();
            fired.push(PerformanceAlert::new(
                AlertKind::Memory,
                AlertSeverity::for_ratio(heap / thresholds.max_memory_mb, 1.2, 1.5),
                heap,
                thresholds.max_memory_mb,
                now_ms,
            ));
        }

        if thresholds.frame_time_breached(snapshot) && !was(AlertThresholds::frame_time_breached) {
            let frame_time = snapshot.longest_frame_ms();
            fired.push(PerformanceAlert::new(
                AlertKind::FrameTime,
                AlertSeverity::for_ratio(frame_time / thresholds.max_frame_time_ms, 1.5, 2.0),
                frame_time,
                thresholds.max_frame_time_ms,
                now_ms,
            ));
        }

        for alert in &fired {
            self.remember(alert.clone());
        }
        fired
    }

    fn remember(&mut self, alert: PerformanceAlert) {
        if self.recent.len() == self.config.recent_capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(alert);
        self.total_fired = self.total_fired.saturating_add(1);
    }

    /// Copy of the recent alerts, oldest first.
    pub fn recent_alerts(&self) -> Vec<PerformanceAlert> {
        self.recent.iter().cloned().collect()
    }

    /// Empty the recent list. Breach state is kept, so an ongoing breach does
    /// not fire again.
    pub fn clear_alerts(&mut self) {
        self.recent.clear();
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Alerts fired since creation, including ones evicted or cleared.
    pub fn total_fired(&self) -> u64 {
        self.total_fired
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.config.thresholds
    }
}
