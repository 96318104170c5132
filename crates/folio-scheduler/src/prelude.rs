//! Prelude for folio-scheduler.
//!
//! ```rust
//! use folio_scheduler::prelude::*;
//!
//! let clock = ManualClock::new(0);
//! clock.advance_ms(250);
//! assert_eq!(clock.now_ms(), 250);
//! ```

pub use crate::backoff::BackoffStrategy;
pub use crate::clock::{Clock, ManualClock, SharedClock, TokioClock};
pub use crate::error::{SchedulerError, SchedulerResult};
pub use crate::task::{TaskHandle, TickFlow, spawn_periodic, spawn_task};
