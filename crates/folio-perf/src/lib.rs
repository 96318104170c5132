//! Frame sampling, adaptive quality tiers and performance alerts.
//!
//! The pipeline runs leaf to root:
//!
//! - **Sampler**: counts frames over a fixed window and produces a
//!   [`PerformanceSnapshot`] per window, with an optional heap reading
//! - **Classifier**: averages FPS over a bounded history and moves between
//!   [`QualityTier`]s at most once per cool-down
//! - **Resolver**: maps a tier to [`QualitySettings`] for the renderer
//! - **Alert emitter**: fires a [`PerformanceAlert`] when a metric crosses
//!   its threshold, never while it stays breached
//! - **Monitor**: owns all of the above plus a cancelable frame task
//!
//! Readings of `0.0` heap mean "unknown" everywhere in this crate.

#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod alerts;
pub mod classifier;
pub mod error;
mod listeners;
pub mod monitor;
pub mod quality;
pub mod report;
pub mod sampler;
pub mod snapshot;

pub mod prelude;

pub use alerts::{
    AlertEmitter, AlertEmitterConfig, AlertKind, AlertSeverity, AlertThresholds,
    DEFAULT_MAX_FRAME_TIME_MS, PerformanceAlert,
};
pub use classifier::{ClassifierConfig, QualityBands, QualityClassifier, QualityTier, TierChange};
pub use error::{PerfError, PerfResult};
pub use listeners::SubscriptionId;
pub use monitor::{
    FrameTicker, IntervalTicker, MonitorConfig, PerformanceMonitor, SnapshotOutcome,
};
pub use quality::{QualitySettings, resolve_quality};
pub use report::PerformanceReport;
pub use sampler::{
    FrameSampler, HeapProbe, NoHeapProbe, ProcessHeapProbe, SamplerConfig, SharedHeapProbe,
};
pub use snapshot::{PerformanceHistory, PerformanceSnapshot};
