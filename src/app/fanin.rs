//! Producers feeding the indicator queue.
//!
//! State-change announcements use the blocking enqueue: they must not be
//! lost. They can still arrive out of order, so each one is applied only if
//! its stamp is not older than the last one the surface accepted. The status
//! refresh uses the non-blocking enqueue and drops a tick when the queue is
//! full.

use std::time::Duration;

use tokio::runtime::Handle;

use crate::indicator::{
    format_status_text, CommandSender, Indicator, IndicatorSurface, SerializerError, Ticker,
};
use crate::timer::{Stamp, TimerManager, TimerObserver};

/// Interval of the "time remaining" refresh.
pub const REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// Forwards timer announcements to the indicator queue.
pub struct IndicatorFanIn<I: Indicator + 'static> {
    sender: CommandSender<IndicatorSurface<I>>,
}

impl<I: Indicator + 'static> IndicatorFanIn<I> {
    pub fn new(sender: CommandSender<IndicatorSurface<I>>) -> Self {
        Self { sender }
    }

    fn deliver(&self, event: &'static str, stamp: Stamp, show: fn(&mut IndicatorSurface<I>)) {
        let command = move |surface: &mut IndicatorSurface<I>| {
            if surface.accept(stamp) {
                show(surface);
            }
        };
        if let Err(err) = self.sender.send(command) {
            tracing::debug!(event, error = %err, "インジケーターへ通知できませんでした");
        }
    }
}

impl<I: Indicator + 'static> TimerObserver for IndicatorFanIn<I> {
    fn on_running(&self, stamp: Stamp) {
        self.deliver("running", stamp, IndicatorSurface::show_running);
    }

    fn on_alert(&self, stamp: Stamp) {
        self.deliver("alert", stamp, IndicatorSurface::show_alert);
    }

    fn on_stop(&self, stamp: Stamp) {
        self.deliver("stop", stamp, IndicatorSurface::show_stopped);
    }
}

/// Enqueues one status text update for the current timer state.
///
/// Returns false if the update was dropped.
pub fn refresh_status<I: Indicator + 'static>(
    timer: &TimerManager,
    sender: &CommandSender<IndicatorSurface<I>>,
) -> bool {
    let snapshot = timer.snapshot();
    let text = format_status_text(snapshot.phase, snapshot.remaining);
    match sender.try_send(move |surface: &mut IndicatorSurface<I>| surface.set_status_text(&text)) {
        Ok(()) => true,
        Err(SerializerError::Full) => {
            tracing::debug!("キューが満杯のため表示更新を破棄しました");
            false
        }
        Err(_) => false,
    }
}

/// Starts the periodic status refresh.
pub fn spawn_refresh<I: Indicator + 'static>(
    runtime: &Handle,
    period: Duration,
    timer: TimerManager,
    sender: CommandSender<IndicatorSurface<I>>,
) -> Ticker {
    Ticker::start(runtime, period, move || {
        refresh_status(&timer, &sender);
    })
}
