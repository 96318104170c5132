//! Frame sampling and heap probing.
//!
//! The sampler counts frames over a fixed window and turns each completed
//! window into a [`PerformanceSnapshot`] carrying the average interval and
//! the longest single frame.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::error::{PerfError, PerfResult};
use crate::snapshot::PerformanceSnapshot;

/// Default number of frames per sampling window.
pub const DEFAULT_WINDOW_FRAMES: u32 = 60;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Source of heap usage readings.
///
/// Returning `None` means the reading is unavailable on this platform.
pub trait HeapProbe: Send + Sync + fmt::Debug {
    /// Current heap usage in megabytes.
    fn heap_used_mb(&self) -> Option<f64>;
}

/// Shared heap probe handle.
pub type SharedHeapProbe = Arc<dyn HeapProbe>;

/// Probe that never has a reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeapProbe;

impl HeapProbe for NoHeapProbe {
    fn heap_used_mb(&self) -> Option<f64> {
        None
    }
}

/// Probe reporting the resident memory of the current process.
pub struct ProcessHeapProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl ProcessHeapProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(reason) => {
                tracing::debug!(reason, "Current process id unavailable, heap probe disabled");
                None
            }
        };

        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for ProcessHeapProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProcessHeapProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHeapProbe")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl HeapProbe for ProcessHeapProbe {
    fn heap_used_mb(&self) -> Option<f64> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let bytes = system.process(pid)?.memory();
        if bytes == 0 {
            return None;
        }
        #[expect(
            clippy::cast_precision_loss,
            reason = "megabyte readings do not need integer precision"
        )]
        let mb = bytes as f64 / BYTES_PER_MB;
        Some(mb)
    }
}

/// Sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Frames per sampling window.
    pub window_frames: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            window_frames: DEFAULT_WINDOW_FRAMES,
        }
    }
}

impl SamplerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::ZeroWindow`] when the window is empty.
    pub fn validate(&self) -> PerfResult<()> {
        if self.window_frames == 0 {
            return Err(PerfError::ZeroWindow);
        }
        Ok(())
    }

    /// Set the number of frames per window.
    #[must_use]
    pub fn with_window_frames(mut self, window_frames: u32) -> Self {
        self.window_frames = window_frames;
        self
    }
}

/// Counts frames and emits one snapshot per completed window.
#[derive(Debug)]
pub struct FrameSampler {
    config: SamplerConfig,
    probe: SharedHeapProbe,
    window_start_ms: Option<u64>,
    last_frame_ms: u64,
    longest_frame_ms: u64,
    frames: u32,
    windows_completed: u64,
}

impl FrameSampler {
    /// Create a sampler.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn new(config: SamplerConfig, probe: SharedHeapProbe) -> PerfResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            probe,
            window_start_ms: None,
            last_frame_ms: 0,
            longest_frame_ms: 0,
            frames: 0,
            windows_completed: 0,
        })
    }

    /// Record a frame at `now_ms`.
    ///
    /// The first call only sets the reference timestamp. Returns a snapshot
    /// when this frame completes a window. Timestamps that move backwards are
    /// treated as zero elapsed time.
    pub fn record_frame(&mut self, now_ms: u64) -> Option<PerformanceSnapshot> {
        let Some(window_start) = self.window_start_ms else {
            self.window_start_ms = Some(now_ms);
            self.last_frame_ms = now_ms;
            return None;
        };

        let gap_ms = now_ms.saturating_sub(self.last_frame_ms);
        self.longest_frame_ms = self.longest_frame_ms.max(gap_ms);
        self.last_frame_ms = self.last_frame_ms.max(now_ms);
        self.frames = self.frames.saturating_add(1);
        if self.frames < self.config.window_frames {
            return None;
        }

        let elapsed_ms = now_ms.saturating_sub(window_start);
        #[expect(
            clippy::cast_precision_loss,
            reason = "window durations are far below 2^52 ms"
        )]
        let interval_ms = elapsed_ms as f64 / f64::from(self.frames);
        let heap_mb = self.probe.heap_used_mb().unwrap_or(0.0);
        #[expect(
            clippy::cast_precision_loss,
            reason = "frame gaps are far below 2^52 ms"
        )]
        let longest_ms = self.longest_frame_ms as f64;
        let snapshot = PerformanceSnapshot::new(interval_ms, heap_mb, now_ms)
            .with_longest_frame_ms(longest_ms);

        self.window_start_ms = Some(now_ms.max(window_start));
        self.longest_frame_ms = 0;
        self.frames = 0;
        self.windows_completed = self.windows_completed.saturating_add(1);

        tracing::trace!(
            fps = snapshot.fps(),
            frame_interval_ms = snapshot.frame_interval_ms(),
            longest_frame_ms = snapshot.longest_frame_ms(),
            heap_used_mb = snapshot.heap_used_mb(),
            "Sampling window completed"
        );
        Some(snapshot)
    }

    /// Drop the partial window and the reference timestamp.
    pub fn reset(&mut self) {
        self.window_start_ms = None;
        self.longest_frame_ms = 0;
        self.frames = 0;
    }

    /// Frames counted in the current partial window.
    pub fn pending_frames(&self) -> u32 {
        self.frames
    }

    pub fn windows_completed(&self) -> u64 {
        self.windows_completed
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}
