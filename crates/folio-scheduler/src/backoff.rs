//! Retry delay policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default base delay for exponential backoff (1s, 2s, 4s, ...).
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Default ceiling for a single backoff delay.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Delay policy between retry attempts.
///
/// `attempt` is zero-based: `delay_for(0)` is the wait after the first failed
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay between every attempt.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Delay doubles after each attempt, capped at `max_ms`.
    Exponential {
        /// First delay in milliseconds.
        base_ms: u64,
        /// Largest delay in milliseconds.
        max_ms: u64,
    },
    /// Delay grows by `increment_ms` after each attempt, capped at `max_ms`.
    Linear {
        /// Step in milliseconds.
        increment_ms: u64,
        /// Largest delay in milliseconds.
        max_ms: u64,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base_ms: DEFAULT_BACKOFF_BASE_MS,
            max_ms: DEFAULT_BACKOFF_MAX_MS,
        }
    }
}

impl BackoffStrategy {
    /// Exponential backoff starting at `base`.
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::Exponential {
            base_ms: duration_ms(base),
            max_ms: duration_ms(max),
        }
    }

    /// Delay to wait after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = match *self {
            Self::Fixed { delay_ms } => delay_ms,
            Self::Exponential { base_ms, max_ms } => {
                let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
                base_ms.saturating_mul(factor).min(max_ms)
            }
            Self::Linear {
                increment_ms,
                max_ms,
            } => increment_ms
                .saturating_mul(u64::from(attempt).saturating_add(1))
                .min(max_ms),
        };
        Duration::from_millis(ms)
    }

    /// Delays for the first `attempts` failures.
    pub fn schedule(&self, attempts: u32) -> Vec<Duration> {
        (0..attempts).map(|attempt| self.delay_for(attempt)).collect()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
