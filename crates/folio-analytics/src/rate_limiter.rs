//! Minimum-interval rate limiting for tracked events.
//!
//! High-frequency sources (scroll, pointer, resize) can emit far more events
//! than are useful. Each event type gets its own limiter; an event arriving
//! sooner than `min_interval_ms` after the last accepted one of the same type
//! is dropped and counted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};

/// Default minimum gap between two events of the same type.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 100;

/// Single-stream limiter working on millisecond timestamps.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval_ms: u64,
    last_processed_ms: Option<u64>,
    dropped_count: u64,
    processed_count: u64,
}

impl RateLimiter {
    /// Create a limiter admitting at most one event per `min_interval_ms`.
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_processed_ms: None,
            dropped_count: 0,
            processed_count: 0,
        }
    }

    /// Returns true if an event at `now_ms` should be processed.
    ///
    /// Timestamps earlier than the last accepted one count as zero elapsed.
    pub fn should_process(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_processed_ms
            && now_ms.saturating_sub(last) < self.min_interval_ms
        {
            self.dropped_count += 1;
            return false;
        }

        self.last_processed_ms = Some(now_ms);
        self.processed_count += 1;
        true
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count
    }

    /// Dropped share of all events seen, in percent.
    pub fn drop_rate_percent(&self) -> f32 {
        let total = self.dropped_count + self.processed_count;
        if total == 0 {
            0.0
        } else {
            (self.dropped_count as f32 / total as f32) * 100.0
        }
    }

    pub fn reset_stats(&mut self) {
        self.dropped_count = 0;
        self.processed_count = 0;
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }
}

/// Limiter statistics for logs and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RateLimiterStats {
    pub processed_count: u64,
    pub dropped_count: u64,
    pub drop_rate_percent: f32,
}

impl From<&RateLimiter> for RateLimiterStats {
    fn from(limiter: &RateLimiter) -> Self {
        Self {
            processed_count: limiter.processed_count,
            dropped_count: limiter.dropped_count,
            drop_rate_percent: limiter.drop_rate_percent(),
        }
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum gap between events of one type.
    pub min_interval_ms: u64,
    /// Event types that bypass limiting.
    pub exempt_types: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            exempt_types: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::ZeroInterval`] when the interval is zero.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.min_interval_ms == 0 {
            return Err(AnalyticsError::ZeroInterval("Rate limit interval"));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_min_interval_ms(mut self, min_interval_ms: u64) -> Self {
        self.min_interval_ms = min_interval_ms;
        self
    }

    #[must_use]
    pub fn with_exempt_type(mut self, event_type: impl Into<String>) -> Self {
        self.exempt_types.push(event_type.into());
        self
    }
}

/// One [`RateLimiter`] per event type.
#[derive(Debug, Clone)]
pub struct KeyedRateLimiter {
    config: RateLimitConfig,
    limiters: HashMap<String, RateLimiter>,
}

impl KeyedRateLimiter {
    /// Create a keyed limiter.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn new(config: RateLimitConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            limiters: HashMap::new(),
        })
    }

    /// Returns true if an event of `event_type` at `now_ms` should be kept.
    pub fn should_process(&mut self, event_type: &str, now_ms: u64) -> bool {
        self.should_process_key(event_type, event_type, now_ms)
    }

    /// Like [`should_process`](Self::should_process), but spaces events by
    /// `key` instead of by type. Exemptions still match on `event_type`.
    pub fn should_process_key(&mut self, event_type: &str, key: &str, now_ms: u64) -> bool {
        if self.config.exempt_types.iter().any(|exempt| exempt == event_type) {
            return true;
        }
        let min_interval_ms = self.config.min_interval_ms;
        self.limiters
            .entry(key.to_string())
            .or_insert_with(|| RateLimiter::new(min_interval_ms))
            .should_process(now_ms)
    }

    /// Stats for one limiter key, usually an event type.
    pub fn stats_for(&self, event_type: &str) -> Option<RateLimiterStats> {
        self.limiters.get(event_type).map(RateLimiterStats::from)
    }

    /// Stats summed over every event type.
    pub fn total_stats(&self) -> RateLimiterStats {
        let mut total = RateLimiter::new(self.config.min_interval_ms);
        for limiter in self.limiters.values() {
            total.processed_count += limiter.processed_count;
            total.dropped_count += limiter.dropped_count;
        }
        RateLimiterStats::from(&total)
    }

    pub fn reset_stats(&mut self) {
        self.limiters.values_mut().for_each(RateLimiter::reset_stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_rate_limiting() {
        let mut limiter = RateLimiter::new(100);

        assert!(limiter.should_process(1_000));
        assert!(!limiter.should_process(1_050));
        assert!(limiter.should_process(1_100));
        assert_eq!(limiter.processed_count(), 2);
        assert_eq!(limiter.dropped_count(), 1);
    }

    #[test]
    fn test_drop_rate_calculation() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.should_process(0));
        assert!(!limiter.should_process(10));
        assert!((limiter.drop_rate_percent() - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stats_reset() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.should_process(0));
        assert!(!limiter.should_process(1));
        limiter.reset_stats();
        assert_eq!(limiter.processed_count(), 0);
        assert_eq!(limiter.dropped_count(), 0);
    }

    #[test]
    fn test_backwards_timestamp_is_dropped() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.should_process(1_000));
        assert!(!limiter.should_process(500));
    }

    #[test]
    fn test_keys_are_independent() -> TestResult {
        let mut limiter = KeyedRateLimiter::new(RateLimitConfig::default())?;
        assert!(limiter.should_process("scroll", 0));
        assert!(limiter.should_process("resize", 10));
        assert!(!limiter.should_process("scroll", 20));

        let scroll = limiter.stats_for("scroll").ok_or("scroll stats missing")?;
        assert_eq!(scroll.dropped_count, 1);
        assert_eq!(limiter.total_stats().processed_count, 2);
        Ok(())
    }

    #[test]
    fn test_sub_keys_limit_separately() -> TestResult {
        let config = RateLimitConfig::default().with_exempt_type("contact_submitted");
        let mut limiter = KeyedRateLimiter::new(config)?;
        assert!(limiter.should_process_key("web_vital", "web_vital:LCP", 0));
        assert!(limiter.should_process_key("web_vital", "web_vital:CLS", 0));
        assert!(!limiter.should_process_key("web_vital", "web_vital:LCP", 1));
        assert!(limiter.should_process_key("contact_submitted", "contact_submitted:a", 0));
        assert!(limiter.should_process_key("contact_submitted", "contact_submitted:a", 0));

        assert!(limiter.stats_for("web_vital").is_none());
        let lcp = limiter.stats_for("web_vital:LCP").ok_or("LCP stats missing")?;
        assert_eq!(lcp.dropped_count, 1);
        Ok(())
    }

    #[test]
    fn test_exempt_types_bypass_limit() -> TestResult {
        let config = RateLimitConfig::default().with_exempt_type("contact_submitted");
        let mut limiter = KeyedRateLimiter::new(config)?;
        for now_ms in 0..5 {
            assert!(limiter.should_process("contact_submitted", now_ms));
        }
        assert!(limiter.stats_for("contact_submitted").is_none());
        Ok(())
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = RateLimitConfig::default().with_min_interval_ms(0);
        assert!(matches!(
            KeyedRateLimiter::new(config),
            Err(AnalyticsError::ZeroInterval(_))
        ));
    }
}
