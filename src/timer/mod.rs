//! Reminder state machine.
//!
//! This module provides the countdown core:
//! - Phase transitions (Stopped → Running → Alerting)
//! - A single pending deferred-fire per countdown
//! - Side-effect announcements (running / alert / stop) for the indicator
//!
//! # Concurrency
//!
//! [`TimerManager`] is cheap to clone and may be driven from any thread
//! (menu handlers, the hotkey listener, the deferred-fire task). Every
//! mutation runs under one mutex that covers the phase, duration, start
//! instant and the cancel/schedule of the deferred-fire. Observer callbacks
//! are invoked after the mutex is released, so an observer may call back into
//! the manager without deadlocking.
//!
//! Because of that, two announcements made from different threads can reach
//! an observer in either order. Each one carries a [`Stamp`] taken under the
//! mutex; an observer that keeps only the newest stamp sees the same final
//! state as the timer.

mod deadline;
mod error;

pub use deadline::DeadlineTimer;
pub use error::TimerError;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::types::TimerPhase;

// ============================================================================
// TimerObserver
// ============================================================================

/// Position of an announcement in the timer's history.
///
/// Ordered by generation, then by stage: the alert of a countdown sorts after
/// its running announcement, and every later start or stop sorts after both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp {
    generation: u64,
    alerted: bool,
}

impl Stamp {
    fn new(generation: u64, alerted: bool) -> Self {
        Self {
            generation,
            alerted,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Receives the side effects of state transitions.
///
/// Implementations must be quick; they run on whichever thread triggered the
/// transition. Calls may arrive out of order, compare stamps to drop the
/// stale ones.
pub trait TimerObserver: Send + Sync {
    /// The countdown (re)started.
    fn on_running(&self, stamp: Stamp);
    /// The countdown elapsed.
    fn on_alert(&self, stamp: Stamp);
    /// The timer was stopped.
    fn on_stop(&self, stamp: Stamp);
}

/// Side effect recorded by [`MockTimerObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Running,
    Alert,
    Stop,
}

/// Observer that records every announcement, for tests.
#[derive(Debug, Default)]
pub struct MockTimerObserver {
    events: Mutex<Vec<(TimerEvent, Stamp)>>,
}

impl MockTimerObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all announcements in the order they were made.
    #[must_use]
    pub fn events(&self) -> Vec<TimerEvent> {
        self.stamped().into_iter().map(|(event, _)| event).collect()
    }

    /// Returns all announcements with their stamps.
    #[must_use]
    pub fn stamped(&self) -> Vec<(TimerEvent, Stamp)> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns how many times `event` was announced.
    #[must_use]
    pub fn count(&self, event: TimerEvent) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn record(&self, event: TimerEvent, stamp: Stamp) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event, stamp));
    }
}

impl TimerObserver for MockTimerObserver {
    fn on_running(&self, stamp: Stamp) {
        self.record(TimerEvent::Running, stamp);
    }

    fn on_alert(&self, stamp: Stamp) {
        self.record(TimerEvent::Alert, stamp);
    }

    fn on_stop(&self, stamp: Stamp) {
        self.record(TimerEvent::Stop, stamp);
    }
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Consistent read of the timer taken under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    /// Configured countdown length (zero until the first start)
    pub duration: Duration,
    /// Time left before the alert; zero unless running
    pub remaining: Duration,
}

// ============================================================================
// TimerManager
// ============================================================================

struct TimerState {
    phase: TimerPhase,
    duration: Duration,
    started_at: Option<Instant>,
    pending: Option<DeadlineTimer>,
    /// Bumped on every start/stop; a fire only counts for its own generation
    generation: u64,
}

impl TimerState {
    fn remaining(&self, now: Instant) -> Duration {
        match (self.phase, self.started_at) {
            (TimerPhase::Running, Some(started_at)) => self
                .duration
                .saturating_sub(now.saturating_duration_since(started_at)),
            _ => Duration::ZERO,
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

enum Announcement {
    Running(Stamp),
    Alert(Stamp),
    Stop(Stamp),
}

struct Shared {
    state: Mutex<TimerState>,
    observer: Arc<dyn TimerObserver>,
    runtime: Handle,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> Instant {
        // Read the runtime's clock even when called from a listener thread.
        let _guard = self.runtime.enter();
        Instant::now()
    }

    fn start_locked(
        self: &Arc<Self>,
        state: &mut TimerState,
        duration: Duration,
    ) -> Announcement {
        state.cancel_pending();
        state.generation = state.generation.wrapping_add(1);
        state.duration = duration;
        state.started_at = Some(self.now());
        state.phase = TimerPhase::Running;

        let shared = Arc::downgrade(self);
        let generation = state.generation;
        state.pending = Some(DeadlineTimer::schedule(&self.runtime, duration, move || {
            if let Some(shared) = shared.upgrade() {
                shared.fire(generation);
            }
        }));

        tracing::info!(duration_secs = duration.as_secs_f64(), "タイマーを開始しました");
        Announcement::Running(Stamp::new(generation, false))
    }

    fn stop_locked(&self, state: &mut TimerState) -> Announcement {
        state.cancel_pending();
        state.generation = state.generation.wrapping_add(1);
        state.started_at = None;
        state.phase = TimerPhase::Stopped;

        tracing::info!("タイマーを停止しました");
        Announcement::Stop(Stamp::new(state.generation, false))
    }

    fn fire(&self, generation: u64) {
        let alerted = {
            let mut state = self.lock();
            if state.generation != generation || state.phase != TimerPhase::Running {
                tracing::debug!(
                    generation,
                    current = state.generation,
                    phase = %state.phase,
                    "古いタイマー発火を破棄しました"
                );
                false
            } else {
                state.phase = TimerPhase::Alerting;
                state.started_at = None;
                state.pending = None;
                true
            }
        };

        if alerted {
            tracing::info!("リマインダーのアラートを発火しました");
            self.announce(Announcement::Alert(Stamp::new(generation, true)));
        }
    }

    fn announce(&self, announcement: Announcement) {
        match announcement {
            Announcement::Running(stamp) => self.observer.on_running(stamp),
            Announcement::Alert(stamp) => self.observer.on_alert(stamp),
            Announcement::Stop(stamp) => self.observer.on_stop(stamp),
        }
    }
}

/// The reminder state machine.
///
/// Owns the phase, duration and start instant together with the lifecycle of
/// the deferred-fire. Clones share the same state.
#[derive(Clone)]
pub struct TimerManager {
    shared: Arc<Shared>,
}

impl TimerManager {
    /// Creates a stopped timer whose deferred-fires run on `runtime`.
    pub fn new(observer: Arc<dyn TimerObserver>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState {
                    phase: TimerPhase::Stopped,
                    duration: Duration::ZERO,
                    started_at: None,
                    pending: None,
                    generation: 0,
                }),
                observer,
                runtime,
            }),
        }
    }

    /// Starts (or restarts) the countdown with `duration`.
    ///
    /// Any pending deferred-fire is cancelled first. The running announcement
    /// is made on every call, including restarts from the running phase.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidDuration`] if `duration` is zero.
    pub fn start(&self, duration: Duration) -> Result<(), TimerError> {
        if duration.is_zero() {
            return Err(TimerError::InvalidDuration);
        }

        let announcement = {
            let mut state = self.shared.lock();
            self.shared.start_locked(&mut state, duration)
        };
        self.shared.announce(announcement);
        Ok(())
    }

    /// Stops the timer. Always announces, even if already stopped.
    pub fn stop(&self) {
        let announcement = {
            let mut state = self.shared.lock();
            self.shared.stop_locked(&mut state)
        };
        self.shared.announce(announcement);
    }

    /// Restarts the countdown with the current duration.
    ///
    /// Returns false (and does nothing) if no duration was ever set.
    pub fn reset(&self) -> bool {
        let announcement = {
            let mut state = self.shared.lock();
            let duration = state.duration;
            if duration.is_zero() {
                tracing::debug!("時間が未設定のためリセットを無視しました");
                return false;
            }
            self.shared.start_locked(&mut state, duration)
        };
        self.shared.announce(announcement);
        true
    }

    /// Restarts the countdown only if the timer is alerting.
    ///
    /// The phase check and the restart happen under one lock, so a stop
    /// racing this call is never undone.
    pub fn reset_if_alerting(&self) -> bool {
        let announcement = {
            let mut state = self.shared.lock();
            if state.phase != TimerPhase::Alerting {
                return false;
            }
            let duration = state.duration;
            self.shared.start_locked(&mut state, duration)
        };
        self.shared.announce(announcement);
        true
    }

    /// Stops an active timer, or restarts a stopped one that has a duration.
    pub fn toggle(&self) {
        let announcement = {
            let mut state = self.shared.lock();
            if state.phase.is_active() {
                Some(self.shared.stop_locked(&mut state))
            } else if !state.duration.is_zero() {
                let duration = state.duration;
                Some(self.shared.start_locked(&mut state, duration))
            } else {
                None
            }
        };

        if let Some(announcement) = announcement {
            self.shared.announce(announcement);
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> TimerPhase {
        self.shared.lock().phase
    }

    /// Returns the configured countdown length (zero if never started).
    pub fn duration(&self) -> Duration {
        self.shared.lock().duration
    }

    /// Returns the time left before the alert, zero unless running.
    pub fn time_remaining(&self) -> Duration {
        let now = self.shared.now();
        self.shared.lock().remaining(now)
    }

    /// Returns phase, duration and remaining time from a single lock.
    pub fn snapshot(&self) -> TimerSnapshot {
        let now = self.shared.now();
        let state = self.shared.lock();
        TimerSnapshot {
            phase: state.phase,
            duration: state.duration,
            remaining: state.remaining(now),
        }
    }

    /// Returns true while a deferred-fire is scheduled.
    pub fn is_fire_pending(&self) -> bool {
        self.shared
            .lock()
            .pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("TimerManager")
            .field("phase", &state.phase)
            .field("duration", &state.duration)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
