//! Performance snapshots and the bounded history that holds them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{PerfError, PerfResult};

/// Default number of snapshots kept by a history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

/// One sampling window worth of performance data.
///
/// Produced by the sampler at the end of each window and never mutated.
/// A heap reading of `0.0` means the heap size is unknown. The longest frame
/// is never shorter than the average interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    fps: f64,
    frame_interval_ms: f64,
    #[serde(default)]
    longest_frame_ms: f64,
    heap_used_mb: f64,
    captured_at_ms: u64,
}

impl PerformanceSnapshot {
    /// Build a snapshot from the average frame interval.
    ///
    /// A zero or non-finite interval yields `fps = 0`. Negative or non-finite
    /// heap readings are stored as unknown.
    pub fn new(frame_interval_ms: f64, heap_used_mb: f64, captured_at_ms: u64) -> Self {
        let frame_interval_ms = if frame_interval_ms.is_finite() && frame_interval_ms > 0.0 {
            frame_interval_ms
        } else {
            0.0
        };
        let fps = if frame_interval_ms > 0.0 {
            1000.0 / frame_interval_ms
        } else {
            0.0
        };

        Self {
            fps,
            frame_interval_ms,
            longest_frame_ms: frame_interval_ms,
            heap_used_mb: sanitize_heap(heap_used_mb),
            captured_at_ms,
        }
    }

    /// Build a snapshot from a frame rate. The frame interval is derived.
    pub fn from_fps(fps: f64, heap_used_mb: f64, captured_at_ms: u64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 0.0 };
        let frame_interval_ms = if fps > 0.0 { 1000.0 / fps } else { 0.0 };

        Self {
            fps,
            frame_interval_ms,
            longest_frame_ms: frame_interval_ms,
            heap_used_mb: sanitize_heap(heap_used_mb),
            captured_at_ms,
        }
    }

    /// Set the longest single frame seen in the window.
    ///
    /// Values below the average interval, or non-finite ones, are raised to
    /// the average.
    #[must_use]
    pub fn with_longest_frame_ms(mut self, longest_frame_ms: f64) -> Self {
        self.longest_frame_ms = if longest_frame_ms.is_finite() {
            longest_frame_ms.max(self.frame_interval_ms)
        } else {
            self.frame_interval_ms
        };
        self
    }

    /// Frames per second over the window.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Average frame interval over the window, in milliseconds.
    pub fn frame_interval_ms(&self) -> f64 {
        self.frame_interval_ms
    }

    /// Longest gap between two consecutive frames in the window, in milliseconds.
    pub fn longest_frame_ms(&self) -> f64 {
        self.longest_frame_ms
    }

    /// Heap usage in MB, `0.0` when unknown.
    pub fn heap_used_mb(&self) -> f64 {
        self.heap_used_mb
    }

    /// Heap usage in MB, `None` when unknown.
    pub fn heap_reading(&self) -> Option<f64> {
        (self.heap_used_mb > 0.0).then_some(self.heap_used_mb)
    }

    /// Timestamp at the end of the window.
    pub fn captured_at_ms(&self) -> u64 {
        self.captured_at_ms
    }
}

fn sanitize_heap(heap_used_mb: f64) -> f64 {
    if heap_used_mb.is_finite() && heap_used_mb > 0.0 {
        heap_used_mb
    } else {
        0.0
    }
}

/// Fixed-capacity ring of snapshots, oldest evicted first.
#[derive(Debug, Clone)]
pub struct PerformanceHistory {
    samples: VecDeque<PerformanceSnapshot>,
    capacity: usize,
}

impl PerformanceHistory {
    /// Create an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::ZeroCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> PerfResult<Self> {
        if capacity == 0 {
            return Err(PerfError::ZeroCapacity("History"));
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a snapshot, evicting the oldest when full.
    pub fn push(&mut self, snapshot: PerformanceSnapshot) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent snapshot.
    pub fn latest(&self) -> Option<PerformanceSnapshot> {
        self.samples.back().copied()
    }

    /// Arithmetic mean FPS over every held snapshot, `None` when empty.
    pub fn mean_fps(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(PerformanceSnapshot::fps).sum();
        Some(sum / self.samples.len() as f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerformanceSnapshot> {
        self.samples.iter()
    }

    /// Copy of the held snapshots, oldest first.
    pub fn to_vec(&self) -> Vec<PerformanceSnapshot> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for PerformanceHistory {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_snapshot_from_interval() {
        let snapshot = PerformanceSnapshot::new(20.0, 128.0, 1_000);
        assert!(approx(snapshot.fps(), 50.0));
        assert!(approx(snapshot.frame_interval_ms(), 20.0));
        assert_eq!(snapshot.heap_reading(), Some(128.0));
        assert_eq!(snapshot.captured_at_ms(), 1_000);
    }

    #[test]
    fn test_longest_frame_defaults_to_average() {
        let snapshot = PerformanceSnapshot::from_fps(50.0, 0.0, 0);
        assert!(approx(snapshot.longest_frame_ms(), 20.0));

        let spiked = snapshot.with_longest_frame_ms(120.0);
        assert!(approx(spiked.longest_frame_ms(), 120.0));
        assert!(approx(spiked.fps(), 50.0));

        let clamped = snapshot.with_longest_frame_ms(5.0);
        assert!(approx(clamped.longest_frame_ms(), 20.0));
        assert!(approx(snapshot.with_longest_frame_ms(f64::NAN).longest_frame_ms(), 20.0));
    }

    #[test]
    fn test_zero_interval_is_zero_fps() {
        let snapshot = PerformanceSnapshot::new(0.0, 0.0, 0);
        assert!(approx(snapshot.fps(), 0.0));
        assert_eq!(snapshot.heap_reading(), None);
    }

    #[test]
    fn test_invalid_heap_is_unknown() {
        assert_eq!(PerformanceSnapshot::from_fps(60.0, -4.0, 0).heap_reading(), None);
        assert_eq!(PerformanceSnapshot::from_fps(60.0, f64::NAN, 0).heap_reading(), None);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            PerformanceHistory::new(0).err(),
            Some(PerfError::ZeroCapacity("History"))
        );
    }

    #[test]
    fn test_history_evicts_oldest() -> TestResult {
        let mut history = PerformanceHistory::new(3)?;
        for (i, fps) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            history.push(PerformanceSnapshot::from_fps(fps, 0.0, i as u64));
        }

        assert_eq!(history.len(), 3);
        let timestamps: Vec<u64> = history.iter().map(|s| s.captured_at_ms()).collect();
        assert_eq!(timestamps, vec![1, 2, 3]);
        assert!(history.mean_fps().is_some_and(|m| approx(m, 30.0)));
        Ok(())
    }

    #[test]
    fn test_mean_of_empty_history() -> TestResult {
        let history = PerformanceHistory::new(5)?;
        assert_eq!(history.mean_fps(), None);
        assert_eq!(history.latest(), None);
        Ok(())
    }
}
