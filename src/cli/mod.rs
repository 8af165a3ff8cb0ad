//! CLI module for HydraReminder.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `display`: Terminal indicator and output formatting
//! - [`InputLine`]: the line protocol read from stdin by `run`

pub mod commands;
pub mod display;

pub use commands::{AutostartAction, Cli, Commands, ConfigAction};
pub use display::{Display, TerminalIndicator};

use std::str::FromStr;

use crate::app::{MenuAction, ParseActionError};

/// One line typed on stdin while the reminder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLine {
    /// A menu action
    Action(MenuAction),
    /// Print the current status
    Status,
    /// Print the accepted commands
    Help,
    /// Nothing typed
    Blank,
}

impl FromStr for InputLine {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(InputLine::Blank),
            "status" => Ok(InputLine::Status),
            "help" | "?" => Ok(InputLine::Help),
            _ => s.parse().map(InputLine::Action),
        }
    }
}
