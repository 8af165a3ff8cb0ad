//! Radio-group debounce.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Window within which a repeated radio selection is ignored.
pub const RADIO_DEBOUNCE: Duration = Duration::from_millis(150);

/// Accepts an event only if the previous accepted one is at least `window`
/// old.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    pub fn accept(&self) -> bool {
        self.accept_at(Instant::now())
    }

    pub fn accept_at(&self, now: Instant) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            if now.saturating_duration_since(previous) < self.window {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(RADIO_DEBOUNCE)
    }
}
