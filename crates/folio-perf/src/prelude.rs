//! Prelude for folio-perf.
//!
//! ```rust
//! use folio_perf::prelude::*;
//!
//! let settings = resolve_quality(QualityTier::Medium);
//! assert_eq!(settings.particle_count, 2_000);
//! ```

pub use crate::alerts::{AlertKind, AlertSeverity, AlertThresholds, PerformanceAlert};
pub use crate::classifier::{QualityTier, TierChange};
pub use crate::error::{PerfError, PerfResult};
pub use crate::listeners::SubscriptionId;
pub use crate::monitor::{FrameTicker, IntervalTicker, MonitorConfig, PerformanceMonitor};
pub use crate::quality::{QualitySettings, resolve_quality};
pub use crate::report::PerformanceReport;
pub use crate::sampler::{HeapProbe, NoHeapProbe, ProcessHeapProbe};
pub use crate::snapshot::PerformanceSnapshot;
