//! Size- and time-triggered event batching.
//!
//! Events queue locally and leave in one batch when either the queue reaches
//! `batch_size` or the flush timer fires, whichever comes first. The timer
//! ticks unconditionally; a tick with nothing queued does nothing. Each flush
//! swaps the whole queue out under the lock and hands it to the transport on
//! a detached task, so `enqueue` never waits on the network.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use folio_scheduler::{TaskHandle, TickFlow, spawn_periodic, spawn_task};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::event::TelemetryEvent;
use crate::transport::SharedTransport;

/// Default number of events per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default flush timer period.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;

const FLUSH_TASK_NAME: &str = "analytics-flush";
const SEND_TASK_NAME: &str = "analytics-send";

/// Batcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// Queue length that triggers an immediate flush.
    pub batch_size: usize,
    /// Flush timer period.
    pub flush_interval_ms: u64,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
        }
    }
}

impl BatcherConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero batch size or flush interval.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.batch_size == 0 {
            return Err(AnalyticsError::ZeroBatchSize);
        }
        if self.flush_interval_ms == 0 {
            return Err(AnalyticsError::ZeroInterval("Flush interval"));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_flush_interval_ms(mut self, flush_interval_ms: u64) -> Self {
        self.flush_interval_ms = flush_interval_ms;
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Counters describing batcher activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatcherStats {
    /// Events accepted into the queue.
    pub enqueued: u64,
    /// Events refused after disposal.
    pub rejected: u64,
    /// Non-empty flushes handed to the transport.
    pub flushes: u64,
    /// Batches the transport accepted.
    pub batches_sent: u64,
    /// Batches the transport failed to deliver.
    pub batches_failed: u64,
    /// Events in accepted batches.
    pub events_sent: u64,
}

/// Why a flush happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The queue reached the batch size.
    Size,
    /// The flush timer fired.
    Timer,
    /// [`EventBatcher::flush_now`] was called.
    Manual,
    /// The batcher is being disposed.
    Dispose,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Size => "size",
            Self::Timer => "timer",
            Self::Manual => "manual",
            Self::Dispose => "dispose",
        };
        f.write_str(name)
    }
}

struct BatcherInner {
    config: BatcherConfig,
    transport: SharedTransport,
    pending: Mutex<Vec<TelemetryEvent>>,
    stats: Mutex<BatcherStats>,
    timer: Mutex<Option<TaskHandle>>,
    disposed: AtomicBool,
}

impl BatcherInner {
    fn take_pending(&self) -> Vec<TelemetryEvent> {
        std::mem::replace(
            &mut *self.pending.lock(),
            Vec::with_capacity(self.config.batch_size),
        )
    }

    fn flush(self: &Arc<Self>, reason: FlushReason) -> usize {
        let batch = self.take_pending();
        self.dispatch(batch, reason)
    }

    fn dispatch(self: &Arc<Self>, batch: Vec<TelemetryEvent>, reason: FlushReason) -> usize {
        let count = batch.len();
        if count == 0 {
            return 0;
        }
        self.stats.lock().flushes += 1;
        tracing::debug!(events = count, %reason, "Flushing analytics batch");

        let inner = Arc::clone(self);
        match spawn_task(SEND_TASK_NAME, async move { inner.deliver(batch).await }) {
            Ok(handle) => handle.detach(),
            Err(err) => {
                tracing::warn!(events = count, error = %err, "Analytics batch dropped");
                self.record_failure();
            }
        }
        count
    }

    async fn deliver(&self, batch: Vec<TelemetryEvent>) {
        let count = batch.len();
        match self.transport.send(batch).await {
            Ok(()) => {
                let mut stats = self.stats.lock();
                stats.batches_sent += 1;
                stats.events_sent += count as u64;
                metrics::counter!("folio_batches_sent_total").increment(1);
            }
            Err(err) => {
                tracing::warn!(
                    transport = self.transport.name(),
                    events = count,
                    error = %err,
                    "Analytics batch delivery failed"
                );
                self.record_failure();
            }
        }
    }

    fn record_failure(&self) {
        self.stats.lock().batches_failed += 1;
        metrics::counter!("folio_batches_failed_total").increment(1);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Mark the batcher disposed and take the queue under one lock, so no
    /// enqueue lands after the final batch. `None` when already disposed.
    fn close(&self) -> Option<Vec<TelemetryEvent>> {
        let mut pending = self.pending.lock();
        if self.disposed.swap(true, Ordering::AcqRel) {
            return None;
        }
        let remaining = std::mem::take(&mut *pending);
        drop(pending);

        if let Some(mut timer) = self.timer.lock().take() {
            timer.cancel();
        }
        Some(remaining)
    }
}

/// Queues events and delivers them in batches.
pub struct EventBatcher {
    inner: Arc<BatcherInner>,
}

impl EventBatcher {
    /// Create a batcher and start its flush timer.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration or when called outside
    /// a tokio runtime.
    pub fn create(config: BatcherConfig, transport: SharedTransport) -> AnalyticsResult<Self> {
        config.validate()?;
        let inner = Arc::new(BatcherInner {
            config,
            transport,
            pending: Mutex::new(Vec::with_capacity(config.batch_size)),
            stats: Mutex::new(BatcherStats::default()),
            timer: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });

        let weak: Weak<BatcherInner> = Arc::downgrade(&inner);
        let timer = spawn_periodic(FLUSH_TASK_NAME, config.flush_interval(), move || {
            match weak.upgrade() {
                Some(inner) if !inner.is_disposed() => {
                    inner.flush(FlushReason::Timer);
                    TickFlow::Continue
                }
                _ => TickFlow::Stop,
            }
        })?;
        *inner.timer.lock() = Some(timer);

        tracing::debug!(
            batch_size = config.batch_size,
            flush_interval_ms = config.flush_interval_ms,
            transport = inner.transport.name(),
            "Event batcher created"
        );
        Ok(Self { inner })
    }

    /// Queue an event. Returns false once the batcher is disposed.
    ///
    /// Reaching the batch size flushes immediately.
    pub fn enqueue(&self, event: TelemetryEvent) -> bool {
        let mut pending = self.inner.pending.lock();
        if self.inner.is_disposed() {
            drop(pending);
            self.inner.stats.lock().rejected += 1;
            tracing::trace!(event_type = event.event_type(), "Event dropped after dispose");
            return false;
        }

        pending.push(event);
        let full_batch = (pending.len() >= self.inner.config.batch_size).then(|| {
            std::mem::replace(
                &mut *pending,
                Vec::with_capacity(self.inner.config.batch_size),
            )
        });
        drop(pending);

        self.inner.stats.lock().enqueued += 1;
        metrics::counter!("folio_events_enqueued_total").increment(1);

        if let Some(batch) = full_batch {
            self.inner.dispatch(batch, FlushReason::Size);
        }
        true
    }

    /// Flush whatever is queued. Returns the number of events handed off.
    pub fn flush_now(&self) -> usize {
        self.inner.flush(FlushReason::Manual)
    }

    /// Stop the timer, deliver what remains, and refuse further events.
    ///
    /// The final batch is awaited rather than detached. Idempotent.
    pub async fn dispose(&self) {
        let Some(remaining) = self.inner.close() else {
            return;
        };

        let count = remaining.len();
        if count > 0 {
            self.inner.stats.lock().flushes += 1;
            tracing::debug!(
                events = count,
                reason = %FlushReason::Dispose,
                "Flushing analytics batch"
            );
            self.inner.deliver(remaining).await;
        }
        tracing::info!(flushed = count, "Event batcher disposed");
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Copy of the queued events, oldest first.
    pub fn pending_events(&self) -> Vec<TelemetryEvent> {
        self.inner.pending.lock().clone()
    }

    pub fn stats(&self) -> BatcherStats {
        *self.inner.stats.lock()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.inner.config
    }
}

impl fmt::Debug for EventBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBatcher")
            .field("config", &self.inner.config)
            .field("pending", &self.pending_len())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Drop for EventBatcher {
    fn drop(&mut self) {
        let Some(remaining) = self.inner.close() else {
            return;
        };
        let flushed = self.inner.dispatch(remaining, FlushReason::Dispose);
        if flushed > 0 {
            tracing::debug!(events = flushed, "Event batcher dropped without dispose");
        }
    }
}
