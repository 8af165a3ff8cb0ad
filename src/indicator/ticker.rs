//! Periodic tick on the tokio runtime.
//!
//! A [`Ticker`] calls its tick function every period until it is stopped.
//! The first tick fires one period after start. Used for the blink
//! animation and the status refresh.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A running periodic tick.
#[derive(Debug)]
pub struct Ticker {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Starts calling `on_tick` every `period`.
    pub fn start<F>(runtime: &Handle, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let start = {
            let _guard = runtime.enter();
            Instant::now() + period
        };

        let task = runtime.spawn(async move {
            let mut ticks = interval_at(start, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticks.tick() => on_tick(),
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            task,
        }
    }

    /// Stops the tick. Returns true only for the call that actually stopped
    /// it; later calls are no-ops.
    pub fn stop(&mut self) -> bool {
        match self.stop.take() {
            Some(stop) => {
                let _ = stop.send(());
                self.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
