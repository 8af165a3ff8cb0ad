//! Visual indicator and its single-writer queue.
//!
//! This module provides:
//! - [`Indicator`]: the host surface (tray icon, terminal, ...)
//! - [`CommandSerializer`]: the only path by which anything mutates it
//! - [`IndicatorSurface`]: the consumer-owned presenter (icons, tooltips,
//!   status text, blink animation)
//!
//! # Architecture
//!
//! Producers (timer announcements, the refresh tick, the blink tick, menu
//! handlers) never touch the indicator. They enqueue closures over
//! [`IndicatorSurface`]; the serializer's consumer thread builds the surface
//! and runs those closures one at a time, so the indicator needs no locking
//! and need not be `Send`.

mod error;
mod serializer;
mod surface;
mod ticker;

pub use error::SerializerError;
pub use serializer::{Command, CommandSender, CommandSerializer, DEFAULT_CAPACITY};
pub use surface::{
    format_status_text, IndicatorSurface, BLINK_PERIOD, TOOLTIP_ALERT, TOOLTIP_RUNNING,
    TOOLTIP_STOPPED,
};
pub use ticker::Ticker;

use std::sync::{Arc, Mutex, PoisonError};

use crate::types::IconKind;

// ============================================================================
// Indicator
// ============================================================================

/// A user-visible surface showing the reminder state.
///
/// Only ever called from the serializer's consumer thread.
pub trait Indicator {
    fn set_icon(&mut self, icon: IconKind);
    fn set_tooltip(&mut self, text: &str);
    /// Updates the "time remaining" line.
    fn set_status_text(&mut self, text: &str);
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn set_icon(&mut self, icon: IconKind) {
        (**self).set_icon(icon);
    }

    fn set_tooltip(&mut self, text: &str) {
        (**self).set_tooltip(text);
    }

    fn set_status_text(&mut self, text: &str) {
        (**self).set_status_text(text);
    }
}

// ============================================================================
// MockIndicator
// ============================================================================

/// A call recorded by [`MockIndicator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorCall {
    Icon(IconKind),
    Tooltip(String),
    StatusText(String),
}

/// Indicator that records every call, for tests.
///
/// Clones share the same log, so a test can keep one clone while the
/// consumer thread owns the other.
#[derive(Debug, Clone, Default)]
pub struct MockIndicator {
    calls: Arc<Mutex<Vec<IndicatorCall>>>,
}

impl MockIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<IndicatorCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Icons set so far, in order.
    #[must_use]
    pub fn icons(&self) -> Vec<IconKind> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndicatorCall::Icon(icon) => Some(icon),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn last_icon(&self) -> Option<IconKind> {
        self.icons().last().copied()
    }

    #[must_use]
    pub fn last_tooltip(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            IndicatorCall::Tooltip(text) => Some(text),
            _ => None,
        })
    }

    /// Status texts set so far, in order.
    #[must_use]
    pub fn status_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndicatorCall::StatusText(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn last_status_text(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            IndicatorCall::StatusText(text) => Some(text),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: IndicatorCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl Indicator for MockIndicator {
    fn set_icon(&mut self, icon: IconKind) {
        self.record(IndicatorCall::Icon(icon));
    }

    fn set_tooltip(&mut self, text: &str) {
        self.record(IndicatorCall::Tooltip(text.to_string()));
    }

    fn set_status_text(&mut self, text: &str) {
        self.record(IndicatorCall::StatusText(text.to_string()));
    }
}
