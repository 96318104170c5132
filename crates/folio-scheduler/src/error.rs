//! Error types for the scheduler crate.

use thiserror::Error;

/// Errors raised when a scheduled task cannot be created or joined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A periodic task was requested with a zero period.
    #[error("Task '{0}' requires a non-zero period")]
    ZeroPeriod(String),

    /// No tokio runtime is available to run the task.
    #[error("Task '{name}' cannot be spawned outside a tokio runtime: {reason}")]
    NoRuntime {
        /// Name the task was spawned with.
        name: String,
        /// Runtime lookup failure.
        reason: String,
    },

    /// The task was cancelled before it completed.
    #[error("Task '{0}' was cancelled")]
    Cancelled(String),

    /// The task panicked while running.
    #[error("Task '{name}' panicked: {reason}")]
    Panicked {
        /// Name the task was spawned with.
        name: String,
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl SchedulerError {
    /// Create a zero period error.
    #[must_use]
    pub fn zero_period(name: impl Into<String>) -> Self {
        Self::ZeroPeriod(name.into())
    }

    /// Create a cancelled error.
    #[must_use]
    pub fn cancelled(name: impl Into<String>) -> Self {
        Self::Cancelled(name.into())
    }
}

/// Result type for scheduler operations.
pub type SchedulerResult<T = ()> = Result<T, SchedulerError>;
