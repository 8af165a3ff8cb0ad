//! HydraReminder Library
//!
//! This library provides the core functionality of the stand-up / drink-water
//! reminder. It includes:
//! - Timer state machine with a single cancellable deferred-fire
//! - Global hotkey listener lifecycle with a blocking stop-then-start handshake
//! - Single-writer command queue for the visual indicator, with blink and
//!   refresh ticks
//! - Application wiring for menu actions and the menu-open reset hook
//! - Settings persistence and start-at-login entries
//! - CLI command parsing and display utilities

pub mod app;
pub mod autostart;
pub mod cli;
pub mod config;
pub mod hotkey;
pub mod indicator;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    AlertStyle, DurationChoice, HotkeyBinding, IconKind, Modifiers, ReminderConfig, TimerPhase,
};

pub use app::{AppOptions, AppStatus, Flow, MenuAction, ReminderApp};

pub use timer::{
    MockTimerObserver, Stamp, TimerError, TimerManager, TimerObserver, TimerSnapshot,
};

pub use hotkey::{HotkeyBackend, HotkeyError, HotkeyManager, MockHotkeyBackend, PlatformBackend};

pub use indicator::{
    CommandSender, CommandSerializer, Indicator, IndicatorSurface, MockIndicator, SerializerError,
};

pub use config::{ConfigError, ConfigStore};

pub use autostart::{AutostartEntry, AutostartError, EntryKind};
