//! User-menu actions.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::types::{key_name, parse_key, DurationChoice, Modifiers};

// ============================================================================
// MenuAction
// ============================================================================

/// Actions that can be triggered from the menu.
///
/// The textual form (`duration 15`, `modifiers ctrl+shift`, `key R`, ...)
/// is what the terminal front end reads from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Start or stop the timer
    Toggle,
    /// Restart the countdown
    Reset,
    /// Select a countdown length and restart with it
    SetDuration(DurationChoice),
    /// Switch between color and blink alerts
    ToggleBlink,
    /// Select the hotkey modifier set
    SetModifiers(Modifiers),
    /// Select the hotkey reset key (virtual key code)
    SetResetKey(u32),
    /// Enable or disable the global hotkey
    SetHotkeyEnabled(bool),
    /// Enable or disable start at login
    SetAutostart(bool),
    /// The host menu was opened
    MenuOpened,
    /// Quit the application
    Quit,
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuAction::Toggle => write!(f, "toggle"),
            MenuAction::Reset => write!(f, "reset"),
            MenuAction::SetDuration(choice) => write!(f, "duration {}", choice.minutes()),
            MenuAction::ToggleBlink => write!(f, "blink"),
            MenuAction::SetModifiers(mods) => write!(f, "modifiers {mods}"),
            MenuAction::SetResetKey(key) => match key_name(*key) {
                Some(name) => write!(f, "key {name}"),
                None => write!(f, "key 0x{key:02X}"),
            },
            MenuAction::SetHotkeyEnabled(on) => write!(f, "hotkey {}", on_off(*on)),
            MenuAction::SetAutostart(on) => write!(f, "autostart {}", on_off(*on)),
            MenuAction::MenuOpened => write!(f, "menu"),
            MenuAction::Quit => write!(f, "quit"),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Errors produced when parsing a menu action line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseActionError {
    #[error("空のコマンドです")]
    Empty,

    #[error("不明なコマンド: {0}")]
    Unknown(String),

    #[error("{0} には引数が必要です")]
    MissingArgument(&'static str),

    #[error("{action} の引数が不正です: {value}")]
    InvalidArgument { action: &'static str, value: String },
}

fn parse_switch(action: &'static str, value: &str) -> Result<bool, ParseActionError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "enable" | "1" => Ok(true),
        "off" | "false" | "disable" | "0" => Ok(false),
        _ => Err(ParseActionError::InvalidArgument {
            action,
            value: value.to_string(),
        }),
    }
}

impl FromStr for MenuAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or(ParseActionError::Empty)?.to_ascii_lowercase();
        let argument = words.collect::<Vec<_>>().join(" ");
        let argument = argument.trim();

        let require = |action: &'static str| {
            if argument.is_empty() {
                Err(ParseActionError::MissingArgument(action))
            } else {
                Ok(argument)
            }
        };
        let invalid = |action: &'static str, value: &str| ParseActionError::InvalidArgument {
            action,
            value: value.to_string(),
        };

        match command.as_str() {
            "toggle" => Ok(MenuAction::Toggle),
            "reset" => Ok(MenuAction::Reset),
            "duration" => {
                let value = require("duration")?;
                value
                    .parse::<u32>()
                    .ok()
                    .and_then(DurationChoice::from_minutes)
                    .map(MenuAction::SetDuration)
                    .ok_or_else(|| invalid("duration", value))
            }
            "blink" => Ok(MenuAction::ToggleBlink),
            "modifiers" => {
                let value = require("modifiers")?;
                value
                    .parse::<Modifiers>()
                    .map(MenuAction::SetModifiers)
                    .map_err(|_| invalid("modifiers", value))
            }
            "key" => {
                let value = require("key")?;
                parse_key(value)
                    .map(MenuAction::SetResetKey)
                    .ok_or_else(|| invalid("key", value))
            }
            "hotkey" => parse_switch("hotkey", require("hotkey")?).map(MenuAction::SetHotkeyEnabled),
            "autostart" => {
                parse_switch("autostart", require("autostart")?).map(MenuAction::SetAutostart)
            }
            "menu" => Ok(MenuAction::MenuOpened),
            "quit" | "exit" => Ok(MenuAction::Quit),
            other => Err(ParseActionError::Unknown(other.to_string())),
        }
    }
}
