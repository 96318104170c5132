//! Prelude for folio-analytics.

pub use crate::batcher::{BatcherConfig, EventBatcher};
pub use crate::error::{AnalyticsError, AnalyticsResult, TransportError};
pub use crate::event::{EventPayload, TelemetryEvent, event_types};
pub use crate::tracker::{AnalyticsTracker, TrackOutcome, TrackerConfig};
pub use crate::transport::{AnalyticsTransport, HttpTransport, LogTransport, SharedTransport};
