//! Quality tier classification with a cool-down.
//!
//! The classifier averages FPS over its history, maps the mean onto a tier
//! through fixed bands, and only moves to a new tier when the cool-down since
//! the previous move has elapsed. It is a plain state machine: notification of
//! subscribers is the monitor's job and happens outside any lock.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PerfError, PerfResult};
use crate::snapshot::{DEFAULT_HISTORY_CAPACITY, PerformanceHistory, PerformanceSnapshot};

/// Default minimum time between two tier changes.
pub const DEFAULT_COOLDOWN_MS: u64 = 5_000;

/// Rendering quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FPS bands mapping a mean frame rate to a tier.
///
/// `mean < low_fps` is low, `mean >= high_fps` is high, anything between is
/// medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityBands {
    pub low_fps: f64,
    pub high_fps: f64,
}

impl Default for QualityBands {
    fn default() -> Self {
        Self {
            low_fps: 30.0,
            high_fps: 55.0,
        }
    }
}

impl QualityBands {
    /// Tier for a mean frame rate.
    pub fn classify(&self, mean_fps: f64) -> QualityTier {
        if mean_fps < self.low_fps {
            QualityTier::Low
        } else if mean_fps < self.high_fps {
            QualityTier::Medium
        } else {
            QualityTier::High
        }
    }

    /// Validate band ordering.
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::InvalidBands`] unless `0 < low_fps <= high_fps`.
    pub fn validate(&self) -> PerfResult<()> {
        let ordered = self.low_fps.is_finite()
            && self.high_fps.is_finite()
            && self.low_fps > 0.0
            && self.low_fps <= self.high_fps;
        if ordered {
            Ok(())
        } else {
            Err(PerfError::InvalidBands {
                low: self.low_fps,
                high: self.high_fps,
            })
        }
    }
}

/// Classifier configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Snapshots averaged for classification.
    pub history_capacity: usize,
    /// Minimum time between tier changes.
    pub cooldown_ms: u64,
    pub bands: QualityBands,
    /// Tier before any classification.
    pub initial_tier: QualityTier,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            bands: QualityBands::default(),
            initial_tier: QualityTier::High,
        }
    }
}

impl ClassifierConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero history capacity or invalid bands.
    pub fn validate(&self) -> PerfResult<()> {
        if self.history_capacity == 0 {
            return Err(PerfError::ZeroCapacity("Classifier history"));
        }
        self.bands.validate()
    }

    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    #[must_use]
    pub fn with_bands(mut self, low_fps: f64, high_fps: f64) -> Self {
        self.bands = QualityBands { low_fps, high_fps };
        self
    }

    #[must_use]
    pub fn with_initial_tier(mut self, tier: QualityTier) -> Self {
        self.initial_tier = tier;
        self
    }
}

/// A tier transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierChange {
    pub from: QualityTier,
    pub to: QualityTier,
    /// Mean FPS that triggered the change, `0.0` for a forced change on an
    /// empty history.
    pub mean_fps: f64,
    pub changed_at_ms: u64,
    /// True when applied through [`QualityClassifier::force_tier`].
    pub forced: bool,
}

/// Tier state machine over a bounded snapshot history.
#[derive(Debug, Clone)]
pub struct QualityClassifier {
    config: ClassifierConfig,
    history: PerformanceHistory,
    current: QualityTier,
    last_change_ms: u64,
}

impl QualityClassifier {
    /// Create a classifier. The first cool-down is measured from `created_at_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn new(config: ClassifierConfig, created_at_ms: u64) -> PerfResult<Self> {
        config.validate()?;
        Ok(Self {
            history: PerformanceHistory::new(config.history_capacity)?,
            current: config.initial_tier,
            last_change_ms: created_at_ms,
            config,
        })
    }

    /// Add a snapshot and apply a tier change if one is due.
    pub fn observe(&mut self, snapshot: PerformanceSnapshot) -> Option<TierChange> {
        self.history.push(snapshot);
        let mean_fps = self.history.mean_fps()?;
        let target = self.config.bands.classify(mean_fps);
        if target == self.current {
            return None;
        }

        let now_ms = snapshot.captured_at_ms();
        let since_last = now_ms.saturating_sub(self.last_change_ms);
        if since_last < self.config.cooldown_ms {
            tracing::trace!(
                current = %self.current,
                target = %target,
                since_last,
                "Tier change held by cool-down"
            );
            return None;
        }

        Some(self.apply(target, mean_fps, now_ms, false))
    }

    /// Set the tier manually and restart the cool-down.
    ///
    /// Returns the change when the tier actually differs.
    pub fn force_tier(&mut self, tier: QualityTier, now_ms: u64) -> Option<TierChange> {
        self.last_change_ms = self.last_change_ms.max(now_ms);
        if tier == self.current {
            return None;
        }
        let mean_fps = self.history.mean_fps().unwrap_or(0.0);
        Some(self.apply(tier, mean_fps, now_ms, true))
    }

    fn apply(&mut self, to: QualityTier, mean_fps: f64, now_ms: u64, forced: bool) -> TierChange {
        let change = TierChange {
            from: self.current,
            to,
            mean_fps,
            changed_at_ms: now_ms,
            forced,
        };
        self.current = to;
        self.last_change_ms = now_ms;
        change
    }

    pub fn current_tier(&self) -> QualityTier {
        self.current
    }

    /// Copy of the history, oldest first.
    pub fn history(&self) -> Vec<PerformanceSnapshot> {
        self.history.to_vec()
    }

    pub fn mean_fps(&self) -> Option<f64> {
        self.history.mean_fps()
    }

    pub fn last_change_ms(&self) -> u64 {
        self.last_change_ms
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}
