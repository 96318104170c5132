//! Error types for performance monitoring.
//!
//! Sampling and classification never fail at runtime. The only errors are
//! invalid configuration caught at construction and lifecycle misuse of the
//! monitor's frame task.

use folio_scheduler::SchedulerError;
use thiserror::Error;

/// Errors raised by the performance monitoring components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PerfError {
    /// A bounded buffer was configured with zero capacity.
    #[error("{0} capacity must be greater than 0")]
    ZeroCapacity(&'static str),

    /// The sampling window was configured with zero frames.
    #[error("Sampling window must contain at least one frame")]
    ZeroWindow,

    /// The frame ticker was configured with a zero rate.
    #[error("Frame rate must be greater than 0 Hz")]
    ZeroFrameRate,

    /// A threshold was not a finite, positive number.
    #[error("Threshold {name} must be finite and positive, got {value}")]
    InvalidThreshold {
        /// Configuration field name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Quality bands overlap or are out of order.
    #[error("Quality bands must satisfy 0 < low ({low}) <= high ({high})")]
    InvalidBands {
        /// FPS below which the tier is low.
        low: f64,
        /// FPS at or above which the tier is high.
        high: f64,
    },

    /// The monitor's frame task is already running.
    #[error("Performance monitor is already running")]
    AlreadyRunning,

    /// The monitor was disposed and cannot be restarted.
    #[error("Performance monitor has been disposed")]
    Disposed,

    /// The frame task could not be scheduled.
    #[error("Failed to schedule frame task: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl PerfError {
    /// Create an invalid threshold error.
    #[must_use]
    pub fn invalid_threshold(name: &'static str, value: f64) -> Self {
        Self::InvalidThreshold { name, value }
    }

    /// Check that `value` is usable as a threshold.
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::InvalidThreshold`] for non-finite or non-positive values.
    pub fn check_threshold(name: &'static str, value: f64) -> PerfResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(Self::invalid_threshold(name, value))
        }
    }
}

/// Result type for performance monitoring operations.
pub type PerfResult<T> = Result<T, PerfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PerfError::invalid_threshold("min_fps", -1.0);
        assert!(err.to_string().contains("min_fps"));

        let err = PerfError::ZeroCapacity("History");
        assert!(err.to_string().contains("History"));
    }

    #[test]
    fn test_check_threshold() {
        assert!(PerfError::check_threshold("x", 30.0).is_ok());
        assert!(PerfError::check_threshold("x", 0.0).is_err());
        assert!(PerfError::check_threshold("x", f64::NAN).is_err());
        assert!(PerfError::check_threshold("x", f64::INFINITY).is_err());
    }
}
