//! One-shot deferred-fire primitive.
//!
//! A [`DeadlineTimer`] runs a callback once after a delay on the tokio
//! runtime unless it is cancelled first. Cancellation is synchronous with
//! respect to the caller: once [`DeadlineTimer::cancel`] returns, the task
//! will not start the callback unless it was already past its sleep, which
//! the state machine resolves with its generation check.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A pending deferred-fire.
#[derive(Debug)]
pub struct DeadlineTimer {
    task: JoinHandle<()>,
}

impl DeadlineTimer {
    /// Schedules `on_fire` to run once after `after` has elapsed.
    ///
    /// `on_fire` runs inside a runtime task and so occupies a worker while
    /// it runs. The reminder's fire announces the alert with a blocking
    /// enqueue onto the indicator queue; that wait is bounded by the
    /// consumer draining commands that each finish quickly. On a
    /// current-thread runtime the tickers on the same runtime pause for as
    /// long as it lasts.
    pub fn schedule<F>(runtime: &Handle, after: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            on_fire();
        });
        Self { task }
    }

    /// Cancels the fire if it has not happened yet.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Returns true once the fire ran or the timer was cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
