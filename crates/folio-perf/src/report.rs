//! Summary of recent performance for debug overlays and the CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::QualityTier;
use crate::quality::{QualitySettings, resolve_quality};
use crate::snapshot::PerformanceSnapshot;

/// Aggregate view of a snapshot history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub sample_count: usize,
    pub mean_fps: f64,
    pub min_fps: f64,
    pub max_fps: f64,
    pub mean_frame_interval_ms: f64,
    /// Latest known heap reading. `None` when the heap size is unknown.
    pub latest_heap_mb: Option<f64>,
    pub tier: QualityTier,
    pub settings: QualitySettings,
    pub recent_alerts: usize,
    pub generated_at_ms: u64,
}

impl PerformanceReport {
    /// Summarize `history`. An empty history reports zeros.
    pub fn from_history(
        history: &[PerformanceSnapshot],
        tier: QualityTier,
        recent_alerts: usize,
        generated_at_ms: u64,
    ) -> Self {
        let mut min_fps = f64::INFINITY;
        let mut max_fps = 0.0_f64;
        let mut fps_sum = 0.0;
        let mut interval_sum = 0.0;

        for snapshot in history {
            min_fps = min_fps.min(snapshot.fps());
            max_fps = max_fps.max(snapshot.fps());
            fps_sum += snapshot.fps();
            interval_sum += snapshot.frame_interval_ms();
        }

        let (mean_fps, mean_frame_interval_ms, min_fps) = if history.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            #[expect(
                clippy::cast_precision_loss,
                reason = "history lengths are tiny"
            )]
            let count = history.len() as f64;
            (fps_sum / count, interval_sum / count, min_fps)
        };

        Self {
            sample_count: history.len(),
            mean_fps,
            min_fps,
            max_fps,
            mean_frame_interval_ms,
            latest_heap_mb: history.last().and_then(PerformanceSnapshot::heap_reading),
            tier,
            settings: resolve_quality(tier),
            recent_alerts,
            generated_at_ms,
        }
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Samples:        {}", self.sample_count)?;
        writeln!(
            f,
            "FPS:            mean {:.1}, min {:.1}, max {:.1}",
            self.mean_fps, self.min_fps, self.max_fps
        )?;
        writeln!(f, "Frame interval: {:.2} ms", self.mean_frame_interval_ms)?;
        match self.latest_heap_mb {
            Some(heap) => writeln!(f, "Heap:           {heap:.1} MB")?,
            None => writeln!(f, "Heap:           unknown")?,
        }
        writeln!(
            f,
            "Quality:        {} ({} particles)",
            self.tier, self.settings.particle_count
        )?;
        write!(f, "Recent alerts:  {}", self.recent_alerts)
    }
}
