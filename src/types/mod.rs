//! Core data types for the reminder.
//!
//! This module defines the data structures used for:
//! - Timer phase and alert presentation
//! - Global hotkey bindings (modifier set + single key)
//! - The persisted configuration record

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// TimerPhase
// ============================================================================

/// Discrete mode of the reminder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// No countdown and no pending deferred-fire
    #[default]
    Stopped,
    /// Counting down towards the alert
    Running,
    /// The countdown elapsed and the user has not reset yet
    Alerting,
}

impl TimerPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Stopped => "stopped",
            TimerPhase::Running => "running",
            TimerPhase::Alerting => "alerting",
        }
    }

    /// Returns true if a toggle would stop the timer.
    pub fn is_active(&self) -> bool {
        matches!(self, TimerPhase::Running | TimerPhase::Alerting)
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// AlertStyle / IconKind
// ============================================================================

/// How the indicator presents the alerting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStyle {
    /// Swap to the alert icon once
    #[default]
    Color,
    /// Alternate alert and running icons until the phase changes
    Blink,
}

impl AlertStyle {
    /// Returns the persisted name of the style.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStyle::Color => "color",
            AlertStyle::Blink => "blink",
        }
    }

    /// Returns the other style.
    pub fn toggled(self) -> Self {
        match self {
            AlertStyle::Color => AlertStyle::Blink,
            AlertStyle::Blink => AlertStyle::Color,
        }
    }
}

/// Icon shown by the visual indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKind {
    Stopped,
    Running,
    Alert,
}

// ============================================================================
// Modifiers
// ============================================================================

/// Modifier set of a hotkey binding.
///
/// Stored with the Win32 `MOD_*` bit layout so the persisted record stays
/// compatible across hosts; each backend maps it to its own representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const ALT: Modifiers = Modifiers(0x0001);
    pub const CONTROL: Modifiers = Modifiers(0x0002);
    pub const SHIFT: Modifiers = Modifiers(0x0004);
    pub const SUPER: Modifiers = Modifiers(0x0008);

    const ALL_BITS: u32 = 0x000F;

    /// Presets offered by the hotkey menu.
    pub const PRESETS: [Modifiers; 3] = [
        Modifiers(0x0003), // CTRL + ALT
        Modifiers(0x0006), // CTRL + SHIFT
        Modifiers(0x000C), // SUPER + SHIFT
    ];

    /// Creates a modifier set from a raw bitmask, keeping unknown bits.
    pub const fn from_bits(bits: u32) -> Self {
        Modifiers(bits)
    }

    /// Returns the raw bitmask.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the mask only uses ALT / CONTROL / SHIFT / SUPER.
    pub const fn is_known(&self) -> bool {
        self.0 & !Self::ALL_BITS == 0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Modifiers::CONTROL, "CTRL"),
            (Modifiers::ALT, "ALT"),
            (Modifiers::SHIFT, "SHIFT"),
            (Modifiers::SUPER, "SUPER"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&parts.join(" + "))
    }
}

impl FromStr for Modifiers {
    type Err = ParseBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::NONE;
        for part in s.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            modifiers = modifiers | parse_modifier(part)?;
        }
        if modifiers.is_empty() {
            return Err(ParseBindingError::Empty);
        }
        Ok(modifiers)
    }
}

fn parse_modifier(name: &str) -> Result<Modifiers, ParseBindingError> {
    match name.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Ok(Modifiers::CONTROL),
        "alt" | "option" => Ok(Modifiers::ALT),
        "shift" => Ok(Modifiers::SHIFT),
        "super" | "win" | "cmd" | "meta" => Ok(Modifiers::SUPER),
        _ => Err(ParseBindingError::UnknownModifier(name.to_string())),
    }
}

// ============================================================================
// HotkeyBinding
// ============================================================================

/// Errors produced when parsing a textual hotkey such as `ctrl+alt+R`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseBindingError {
    #[error("ホットキーが空です")]
    Empty,

    #[error("不明な修飾キー: {0}")]
    UnknownModifier(String),

    #[error("不明なキー: {0}")]
    UnknownKey(String),

    #[error("修飾キーのないホットキーは登録できません")]
    MissingModifier,
}

/// A global shortcut: modifier set plus one virtual key code.
///
/// Key codes follow the Windows virtual-key table: `A`..`Z` are 0x41..0x5A,
/// `0`..`9` are 0x30..0x39 and `F1`..`F12` are 0x70..0x7B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub modifiers: Modifiers,
    pub key: u32,
}

impl HotkeyBinding {
    pub const fn new(modifiers: Modifiers, key: u32) -> Self {
        Self { modifiers, key }
    }

    /// Binding for a letter key, e.g. `HotkeyBinding::letter(mods, 'R')`.
    pub fn letter(modifiers: Modifiers, letter: char) -> Self {
        Self::new(modifiers, letter.to_ascii_uppercase() as u32)
    }

    /// Returns true if both the key and the modifiers are representable on
    /// every backend.
    pub fn is_supported(&self) -> bool {
        key_name(self.key).is_some() && self.modifiers.is_known() && !self.modifiers.is_empty()
    }
}

impl Default for HotkeyBinding {
    fn default() -> Self {
        Self::new(Modifiers::CONTROL | Modifiers::ALT, 0x52)
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match key_name(self.key) {
            Some(key) => write!(f, "{} + {}", self.modifiers, key),
            None => write!(f, "{} + 0x{:02X}", self.modifiers, self.key),
        }
    }
}

impl FromStr for HotkeyBinding {
    type Err = ParseBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).filter(|p| !p.is_empty()).collect();
        let (key, mods) = parts.split_last().ok_or(ParseBindingError::Empty)?;

        let mut modifiers = Modifiers::NONE;
        for part in mods {
            modifiers = modifiers | parse_modifier(part)?;
        }
        if modifiers.is_empty() {
            return Err(ParseBindingError::MissingModifier);
        }

        let key = parse_key(key).ok_or_else(|| ParseBindingError::UnknownKey(key.to_string()))?;
        Ok(Self::new(modifiers, key))
    }
}

/// Parses a key name (`R`, `7`, `F5`) into a virtual key code.
pub fn parse_key(name: &str) -> Option<u32> {
    let upper = name.trim().to_ascii_uppercase();
    let mut chars = upper.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() || c.is_ascii_digit() => Some(c as u32),
        (Some('F'), Some(_)) => match upper[1..].parse::<u32>() {
            Ok(n @ 1..=12) => Some(0x70 + n - 1),
            _ => None,
        },
        _ => None,
    }
}

/// Returns the display name of a supported virtual key code.
pub fn key_name(vk: u32) -> Option<String> {
    match vk {
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(vk).map(String::from),
        0x70..=0x7B => Some(format!("F{}", vk - 0x70 + 1)),
        _ => None,
    }
}

// ============================================================================
// DurationChoice
// ============================================================================

/// Countdown lengths offered by the duration menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationChoice {
    /// 10 seconds, persisted as `0` minutes
    Debug,
    Minutes15,
    Minutes30,
    Minutes45,
    Minutes60,
}

impl DurationChoice {
    pub const ALL: [DurationChoice; 5] = [
        DurationChoice::Debug,
        DurationChoice::Minutes15,
        DurationChoice::Minutes30,
        DurationChoice::Minutes45,
        DurationChoice::Minutes60,
    ];

    /// Returns the persisted minute value.
    pub fn minutes(&self) -> u32 {
        match self {
            DurationChoice::Debug => 0,
            DurationChoice::Minutes15 => 15,
            DurationChoice::Minutes30 => 30,
            DurationChoice::Minutes45 => 45,
            DurationChoice::Minutes60 => 60,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.minutes() == minutes)
    }

    pub fn duration(&self) -> Duration {
        duration_from_minutes(self.minutes())
    }

    /// Menu label for this choice.
    pub fn label(&self) -> String {
        match self {
            DurationChoice::Debug => "10 seconds (Debug)".to_string(),
            other => format!("{} min", other.minutes()),
        }
    }
}

/// Maps a persisted minute value to a countdown span (`0` is the debug option).
pub fn duration_from_minutes(minutes: u32) -> Duration {
    if minutes == 0 {
        Duration::from_secs(10)
    } else {
        Duration::from_secs(u64::from(minutes) * 60)
    }
}

// ============================================================================
// ReminderConfig
// ============================================================================

/// The persisted configuration record.
///
/// Missing keys fall back to the defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Countdown length in minutes (`0` = 10 second debug option)
    pub duration_minutes: u32,
    /// Alert colour used by icon renderers
    pub alert_color: String,
    /// Alert presentation
    pub alert_style: AlertStyle,
    /// Whether the global reset hotkey is registered at startup
    pub hotkey_enabled: bool,
    /// Win32-style modifier bitmask
    pub hotkey_modifiers: Modifiers,
    /// Virtual key code of the reset key
    pub hotkey_reset_key: u32,
    /// Whether the autostart entry is installed
    pub autostart: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        let binding = HotkeyBinding::default();
        Self {
            duration_minutes: 30,
            alert_color: "#FF0000".to_string(),
            alert_style: AlertStyle::Color,
            hotkey_enabled: false,
            hotkey_modifiers: binding.modifiers,
            hotkey_reset_key: binding.key,
            autostart: false,
        }
    }
}

impl ReminderConfig {
    /// Countdown span for the configured duration.
    pub fn timer_duration(&self) -> Duration {
        duration_from_minutes(self.duration_minutes)
    }

    /// The configured reset hotkey.
    pub fn hotkey_binding(&self) -> HotkeyBinding {
        HotkeyBinding::new(self.hotkey_modifiers, self.hotkey_reset_key)
    }
}

// ============================================================================
// Tests
// ============================================================================
