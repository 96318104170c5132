//! Spawned tasks with explicit, cancelable handles.
//!
//! Replaces implicit interval IDs with a handle that is returned from "start"
//! and consumed by "stop". Dropping the handle aborts the task, so a component
//! that owns its handles cannot leave timers firing into a torn-down context.

use std::any::Any;
use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{SchedulerError, SchedulerResult};

/// Whether a periodic task should keep running after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    /// Schedule the next tick.
    Continue,
    /// End the task after this tick.
    Stop,
}

/// Handle to a spawned task.
///
/// The task is aborted by [`TaskHandle::cancel`] or when the handle is dropped.
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    fn new(name: String, handle: JoinHandle<()>) -> Self {
        Self {
            name,
            handle: Some(handle),
        }
    }

    /// Name the task was spawned with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while the task is scheduled and has not finished.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort the task. Returns true if the task was still running.
    ///
    /// Once this returns, the task will not be polled again.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                if was_running {
                    tracing::debug!(task = %self.name, "Task cancelled");
                }
                was_running
            }
            None => false,
        }
    }

    /// Let the task run to completion without a handle.
    ///
    /// Used for fire-and-forget work such as batch delivery.
    pub fn detach(mut self) {
        if self.handle.take().is_some() {
            tracing::trace!(task = %self.name, "Task detached");
        }
    }

    /// Wait for the task to finish on its own.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Cancelled`] if the task was aborted and
    /// [`SchedulerError::Panicked`] if it panicked.
    pub async fn join(mut self) -> SchedulerResult<()> {
        let Some(handle) = self.handle.take() else {
            return Err(SchedulerError::cancelled(self.name.clone()));
        };

        match handle.await {
            Ok(()) => Ok(()),
            Err(err) => Err(join_error(&self.name, err)),
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn a future on the current tokio runtime.
///
/// # Errors
///
/// Returns [`SchedulerError::NoRuntime`] when called outside a tokio runtime.
pub fn spawn_task<F>(name: impl Into<String>, future: F) -> SchedulerResult<TaskHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    let runtime = current_runtime(&name)?;
    let handle = runtime.spawn(future);
    tracing::debug!(task = %name, "Task spawned");
    Ok(TaskHandle::new(name, handle))
}

/// Run `on_tick` every `period`, starting one period from now.
///
/// The timer is unconditional: it keeps ticking until the callback returns
/// [`TickFlow::Stop`] or the handle is cancelled. Missed ticks are delayed,
/// not bunched.
///
/// # Errors
///
/// Returns [`SchedulerError::ZeroPeriod`] for a zero period and
/// [`SchedulerError::NoRuntime`] when called outside a tokio runtime.
pub fn spawn_periodic<F>(
    name: impl Into<String>,
    period: Duration,
    mut on_tick: F,
) -> SchedulerResult<TaskHandle>
where
    F: FnMut() -> TickFlow + Send + 'static,
{
    let name = name.into();
    if period.is_zero() {
        return Err(SchedulerError::zero_period(name));
    }

    spawn_task(name, async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if on_tick() == TickFlow::Stop {
                break;
            }
        }
    })
}

fn current_runtime(name: &str) -> SchedulerResult<Handle> {
    Handle::try_current().map_err(|err| SchedulerError::NoRuntime {
        name: name.to_string(),
        reason: err.to_string(),
    })
}

fn join_error(name: &str, err: JoinError) -> SchedulerError {
    if err.is_cancelled() {
        return SchedulerError::cancelled(name);
    }

    SchedulerError::Panicked {
        name: name.to_string(),
        reason: panic_message(err.into_panic()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "unknown panic".to_string(), |s| (*s).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_spawn_outside_runtime_fails() {
        let result = spawn_task("orphan", async {});
        assert!(matches!(result, Err(SchedulerError::NoRuntime { .. })));
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let result = spawn_periodic("zero", Duration::ZERO, || TickFlow::Continue);
        assert!(matches!(result, Err(SchedulerError::ZeroPeriod(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_ticks_after_each_period() -> TestResult {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let _handle = spawn_periodic("ticker", Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            TickFlow::Continue
        })?;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_task() -> TestResult {
        let handle = spawn_periodic("once", Duration::from_millis(10), || TickFlow::Stop)?;
        handle.join().await?;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_task_runs_to_completion() -> TestResult {
        let done = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&done);
        let handle = spawn_task("detached", async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(1, Ordering::SeqCst);
        })?;
        handle.detach();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_join_reports_panic() -> TestResult {
        fn explode() {
            panic!("exploded");
        }

        let handle = spawn_task("boom", async { explode() })?;
        let result = handle.join().await;
        match result {
            Err(SchedulerError::Panicked { reason, .. }) => assert!(reason.contains("exploded")),
            other => return Err(format!("unexpected join result: {other:?}").into()),
        }
        Ok(())
    }
}
