//! Command definitions for the HydraReminder CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

// ============================================================================
// CLI Structure
// ============================================================================

/// HydraReminder - stand up and drink water
#[derive(Parser, Debug)]
#[command(
    name = "hydra-reminder",
    version,
    about = "立ち上がって水を飲むためのリマインダー",
    long_about = "一定時間ごとにアラートを表示するバックグラウンドリマインダー。\n\
                  グローバルホットキーでカウントダウンをリセットできます。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path of the settings file
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the reminder, reading menu actions from stdin
    Run,

    /// Inspect or reset the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage start at login
    Autostart {
        #[command(subcommand)]
        action: AutostartAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// `config` subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the current settings as JSON
    Show,
    /// Print the settings file location
    Path,
    /// Overwrite the settings file with the defaults
    Reset,
}

/// `autostart` subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutostartAction {
    /// Install the start-at-login entry
    Enable,
    /// Remove the start-at-login entry
    Disable,
    /// Show whether the entry is installed
    Status,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["hydra-reminder"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.config.is_none());
        }

        #[test]
        fn test_parse_run() {
            let cli = Cli::parse_from(["hydra-reminder", "run"]);
            assert_eq!(cli.command, Some(Commands::Run));
        }

        #[test]
        fn test_parse_global_flags_after_subcommand() {
            let cli = Cli::parse_from(["hydra-reminder", "run", "-v", "--config", "/tmp/c.json"]);
            assert!(cli.verbose);
            assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        }

        #[test]
        fn test_parse_config_actions() {
            let cli = Cli::parse_from(["hydra-reminder", "config", "show"]);
            assert_eq!(
                cli.command,
                Some(Commands::Config {
                    action: ConfigAction::Show
                })
            );

            let cli = Cli::parse_from(["hydra-reminder", "config", "reset"]);
            assert_eq!(
                cli.command,
                Some(Commands::Config {
                    action: ConfigAction::Reset
                })
            );
        }

        #[test]
        fn test_parse_autostart_actions() {
            let cli = Cli::parse_from(["hydra-reminder", "autostart", "status"]);
            assert_eq!(
                cli.command,
                Some(Commands::Autostart {
                    action: AutostartAction::Status
                })
            );
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["hydra-reminder", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_parse_unknown_command() {
            assert!(Cli::try_parse_from(["hydra-reminder", "unknown"]).is_err());
        }

        #[test]
        fn test_config_requires_action() {
            assert!(Cli::try_parse_from(["hydra-reminder", "config"]).is_err());
        }

        #[test]
        fn test_parse_completions_invalid_shell() {
            assert!(Cli::try_parse_from(["hydra-reminder", "completions", "invalid"]).is_err());
        }
    }
}
