//! Runtime wiring, configuration and CLI support for folio telemetry.
//!
//! - **TelemetryConfig**: one serde document covering every component
//! - **TelemetryRuntime**: builds monitor, batcher, tracker and activity feed
//!   and forwards performance events into analytics
//! - **run_simulation**: drives the monitor with synthetic frame profiles

#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod config;
pub mod logging;
pub mod runtime;
pub mod simulate;

pub use config::{ActivityConfig, AnalyticsConfig, ConfigFormat, TelemetryConfig};
pub use logging::{LoggingConfig, init_logging};
pub use runtime::TelemetryRuntime;
pub use simulate::{DEFAULT_SIMULATED_FRAMES, FrameProfile, SimulationSummary, run_simulation};
