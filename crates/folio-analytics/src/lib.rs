//! Batched, rate-limited analytics for folio telemetry.
//!
//! - **TelemetryEvent**: an event type plus an open JSON payload
//! - **EventBatcher**: queues events and flushes on size or timer
//! - **AnalyticsTransport**: where batches go (HTTP endpoint or the log)
//! - **AnalyticsTracker**: typed helpers with per-type rate limiting
//!
//! Delivery is best effort. A failed batch is logged and counted, never
//! retried.

#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod batcher;
pub mod error;
pub mod event;
pub mod rate_limiter;
pub mod tracker;
pub mod transport;

pub mod prelude;

pub use batcher::{BatcherConfig, BatcherStats, EventBatcher, FlushReason};
pub use error::{AnalyticsError, AnalyticsResult, TransportError};
pub use event::{EventPayload, TelemetryEvent, event_types};
pub use rate_limiter::{KeyedRateLimiter, RateLimitConfig, RateLimiter, RateLimiterStats};
pub use tracker::{AnalyticsTracker, TrackOutcome, TrackerConfig};
pub use transport::{AnalyticsTransport, HttpTransport, LogTransport, SharedTransport};
