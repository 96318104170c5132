//! Cancelable timers, injectable clocks and retry backoff for folio telemetry.
//!
//! Every long-lived loop in the telemetry crates (frame sampling, batch flush
//! timers, fetch retries) is built from the pieces in this crate:
//!
//! - **Clock**: millisecond timestamps from a tokio-aware monotonic clock, or a
//!   manually driven clock for tests
//! - **TaskHandle**: an explicit handle returned from `spawn_task` /
//!   `spawn_periodic`; cancelling or dropping it aborts the task
//! - **BackoffStrategy**: fixed, linear and exponential retry delays
//!
//! # Teardown Guarantees
//!
//! - A cancelled task is never polled again, so no callback fires after
//!   `TaskHandle::cancel()` returns on the thread driving the runtime
//! - Dropping a `TaskHandle` cancels the task; handles never leak timers
//!
//! # Example
//!
//! ```no_run
//! use folio_scheduler::{spawn_periodic, TickFlow};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), folio_scheduler::SchedulerError> {
//! let mut handle = spawn_periodic("flush", Duration::from_secs(5), || {
//!     // flush pending work here
//!     TickFlow::Continue
//! })?;
//!
//! handle.cancel();
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod backoff;
pub mod clock;
pub mod error;
pub mod task;

pub mod prelude;

pub use backoff::BackoffStrategy;
pub use clock::{Clock, ManualClock, SharedClock, TokioClock};
pub use error::{SchedulerError, SchedulerResult};
pub use task::{TaskHandle, TickFlow, spawn_periodic, spawn_task};
