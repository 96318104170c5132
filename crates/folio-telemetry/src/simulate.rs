//! Synthetic frame-time profiles for exercising the monitor.
//!
//! Profiles are deterministic, so a given profile and frame count always
//! produces the same snapshots, tier changes and alerts.

use std::sync::Arc;

use folio_perf::{PerformanceAlert, PerformanceReport, TierChange};
use folio_scheduler::ManualClock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::runtime::TelemetryRuntime;

/// Default number of simulated frames (30 s at 60 fps).
pub const DEFAULT_SIMULATED_FRAMES: u64 = 1_800;

const STEADY_FRAME_MS: u64 = 16;
const DEGRADED_FRAME_MS: u64 = 50;
const JITTER_PATTERN_MS: [u64; 4] = [12, 16, 20, 45];

/// Shape of the synthetic frame times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FrameProfile {
    /// 16 ms frames throughout.
    Steady,
    /// Frame time climbs linearly from 16 ms to 50 ms.
    Degrading,
    /// Repeating 12/16/20/45 ms pattern, about 43 fps.
    Jittery,
}

impl FrameProfile {
    /// Gap before frame `frame` of a `total`-frame run.
    pub fn frame_interval_ms(self, frame: u64, total: u64) -> u64 {
        match self {
            Self::Steady => STEADY_FRAME_MS,
            Self::Degrading => {
                let span = DEGRADED_FRAME_MS.saturating_sub(STEADY_FRAME_MS);
                let progress = span.saturating_mul(frame).checked_div(total).unwrap_or(span);
                STEADY_FRAME_MS.saturating_add(progress.min(span))
            }
            Self::Jittery => {
                let slot = usize::try_from(frame % 4).unwrap_or_default();
                JITTER_PATTERN_MS.get(slot).copied().unwrap_or(STEADY_FRAME_MS)
            }
        }
    }
}

/// Everything observed during one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub profile: FrameProfile,
    pub frames: u64,
    pub snapshots: usize,
    pub tier_changes: Vec<TierChange>,
    pub alerts: Vec<PerformanceAlert>,
    pub report: PerformanceReport,
}

/// Feed `frames` synthetic frames into the runtime's monitor.
///
/// `clock` must be the clock the runtime was built with; it is advanced by
/// each frame gap so cool-downs and rate limits see simulated time.
pub fn run_simulation(
    runtime: &TelemetryRuntime,
    clock: &ManualClock,
    profile: FrameProfile,
    frames: u64,
) -> SimulationSummary {
    let monitor = runtime.monitor();
    let changes = Arc::new(Mutex::new(Vec::new()));
    let alerts = Arc::new(Mutex::new(Vec::new()));

    let change_sink = Arc::clone(&changes);
    let change_sub = monitor.on_tier_change(move |change| change_sink.lock().push(*change));
    let alert_sink = Arc::clone(&alerts);
    let alert_sub = monitor.on_alert(move |alert| alert_sink.lock().push(alert.clone()));

    tracing::info!(?profile, frames, "Simulation started");
    let mut snapshots = 0_usize;
    for frame in 0..=frames {
        if frame > 0 {
            clock.advance_ms(profile.frame_interval_ms(frame, frames));
        }
        if monitor.record_frame().is_some() {
            snapshots = snapshots.saturating_add(1);
        }
    }

    monitor.unsubscribe(change_sub);
    monitor.unsubscribe(alert_sub);

    let tier_changes = std::mem::take(&mut *changes.lock());
    let alerts = std::mem::take(&mut *alerts.lock());
    tracing::info!(
        snapshots,
        tier_changes = tier_changes.len(),
        alerts = alerts.len(),
        final_tier = %monitor.current_tier(),
        "Simulation finished"
    );

    SimulationSummary {
        profile,
        frames,
        snapshots,
        tier_changes,
        alerts,
        report: monitor.report(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrading_profile_spans_range() {
        let profile = FrameProfile::Degrading;
        assert_eq!(profile.frame_interval_ms(0, 100), 16);
        assert_eq!(profile.frame_interval_ms(50, 100), 33);
        assert_eq!(profile.frame_interval_ms(100, 100), 50);
        assert_eq!(profile.frame_interval_ms(500, 100), 50);
    }

    #[test]
    fn test_jittery_profile_repeats() {
        let gaps: Vec<u64> = (0..8)
            .map(|frame| FrameProfile::Jittery.frame_interval_ms(frame, 8))
            .collect();
        assert_eq!(gaps, vec![12, 16, 20, 45, 12, 16, 20, 45]);
    }

    #[test]
    fn test_steady_profile_is_constant() {
        assert!((0..100).all(|frame| FrameProfile::Steady.frame_interval_ms(frame, 100) == 16));
    }
}
