//! Display utilities for the HydraReminder CLI.
//!
//! This module provides formatted output for:
//! - The terminal indicator used by `run`
//! - Status, settings and autostart reports
//! - Error messages

use std::io::{self, Write};
use std::path::Path;

use crate::app::AppStatus;
use crate::indicator::{format_status_text, Indicator};
use crate::types::{DurationChoice, IconKind, ReminderConfig, TimerPhase};

// ============================================================================
// TerminalIndicator
// ============================================================================

/// Indicator that prints icon and tooltip changes to stdout.
///
/// The per-second status text is only logged at debug level.
#[derive(Debug, Default)]
pub struct TerminalIndicator {
    icon: Option<IconKind>,
}

impl TerminalIndicator {
    pub fn new() -> Self {
        Self::default()
    }
}

fn icon_label(icon: IconKind) -> &'static str {
    match icon {
        IconKind::Stopped => "[ ]",
        IconKind::Running => "[*]",
        IconKind::Alert => "[!]",
    }
}

impl Indicator for TerminalIndicator {
    fn set_icon(&mut self, icon: IconKind) {
        self.icon = Some(icon);
        tracing::debug!(icon = icon_label(icon), "アイコンを更新しました");
    }

    fn set_tooltip(&mut self, text: &str) {
        let label = self.icon.map_or("[?]", icon_label);
        let mut stdout = io::stdout().lock();
        // A closed stdout must not take the indicator thread down.
        let _ = writeln!(stdout, "{label} {text}");
        let _ = stdout.flush();
    }

    fn set_status_text(&mut self, text: &str) {
        tracing::debug!(status = text, "残り時間を更新しました");
    }
}

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Renders the `status` report.
    pub fn render_status(status: &AppStatus) -> String {
        let hotkey = if !status.hotkey_enabled {
            "無効".to_string()
        } else if status.hotkey_failed {
            format!("{} (停止不能)", status.binding)
        } else if status.active_binding.is_some() {
            format!("{} (登録済み)", status.binding)
        } else {
            format!("{} (未登録)", status.binding)
        };

        [
            "HydraReminder ステータス".to_string(),
            "─────────────────────────────".to_string(),
            format!("状態: {}", phase_label(status)),
            format_status_text(status.timer.phase, status.timer.remaining),
            format!("アラート: {}", status.alert_style.as_str()),
            format!("ホットキー: {hotkey}"),
            format!("自動起動: {}", on_off(status.autostart)),
        ]
        .join("\n")
    }

    /// Shows the current status.
    pub fn show_status(status: &AppStatus) {
        println!("{}", Self::render_status(status));
    }

    /// Renders the settings summary printed by `config show`.
    pub fn render_config(config: &ReminderConfig, path: &Path) -> String {
        let duration = DurationChoice::from_minutes(config.duration_minutes)
            .map_or_else(|| format!("{} min", config.duration_minutes), |c| c.label());
        [
            format!("設定ファイル: {}", path.display()),
            format!("間隔: {duration}"),
            format!("アラート: {} ({})", config.alert_style.as_str(), config.alert_color),
            format!(
                "ホットキー: {} [{}]",
                config.hotkey_binding(),
                on_off(config.hotkey_enabled)
            ),
            format!("自動起動: {}", on_off(config.autostart)),
        ]
        .join("\n")
    }

    /// Shows the result of an autostart change or query.
    pub fn show_autostart(enabled: bool, path: &Path) {
        println!("自動起動: {}", on_off(enabled));
        println!("  {}", path.display());
    }

    /// Shows the commands accepted on stdin by `run`.
    pub fn show_help() {
        println!("コマンド:");
        for (command, description) in HELP {
            println!("  {command:<22} {description}");
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }
}

const HELP: [(&str, &str); 12] = [
    ("toggle", "タイマーの開始 / 停止"),
    ("reset", "カウントダウンをやり直す"),
    ("duration 0|15|30|45|60", "間隔を変更して再開 (0 = 10秒)"),
    ("blink", "点滅 / 色変更を切り替え"),
    ("modifiers ctrl+alt", "ホットキーの修飾キー"),
    ("key R", "ホットキーのキー"),
    ("hotkey on|off", "ホットキーの有効化"),
    ("autostart on|off", "ログイン時の自動起動"),
    ("menu", "メニューを開いた扱い (アラート中ならリセット)"),
    ("status", "現在の状態を表示"),
    ("help", "このヘルプ"),
    ("quit", "終了"),
];

fn phase_label(status: &AppStatus) -> &'static str {
    match status.timer.phase {
        TimerPhase::Stopped => "停止中",
        TimerPhase::Running => "カウントダウン中",
        TimerPhase::Alerting => "アラート中",
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "有効"
    } else {
        "無効"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerSnapshot;
    use crate::types::{AlertStyle, HotkeyBinding};
    use std::path::PathBuf;
    use std::time::Duration;

    fn create_status(phase: TimerPhase, remaining: u64) -> AppStatus {
        AppStatus {
            timer: TimerSnapshot {
                phase,
                duration: Duration::from_secs(1800),
                remaining: Duration::from_secs(remaining),
            },
            alert_style: AlertStyle::Blink,
            hotkey_enabled: true,
            binding: HotkeyBinding::default(),
            active_binding: Some(HotkeyBinding::default()),
            hotkey_failed: false,
            autostart: false,
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_render_running() {
            let text = Display::render_status(&create_status(TimerPhase::Running, 754));
            assert!(text.contains("状態: カウントダウン中"));
            assert!(text.contains("Time Remaining: 12:34"));
            assert!(text.contains("アラート: blink"));
            assert!(text.contains("ホットキー: CTRL + ALT + R (登録済み)"));
            assert!(text.contains("自動起動: 無効"));
        }

        #[test]
        fn test_render_alerting() {
            let text = Display::render_status(&create_status(TimerPhase::Alerting, 0));
            assert!(text.contains("Time Remaining: 00:00 (Alert!)"));
        }

        #[test]
        fn test_render_unregistered_hotkey() {
            let mut status = create_status(TimerPhase::Stopped, 0);
            status.active_binding = None;
            let text = Display::render_status(&status);
            assert!(text.contains("(未登録)"));

            status.hotkey_enabled = false;
            let text = Display::render_status(&status);
            assert!(text.contains("ホットキー: 無効"));
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_render_default_config() {
            let path = PathBuf::from("/tmp/config.json");
            let text = Display::render_config(&ReminderConfig::default(), &path);
            assert!(text.contains("/tmp/config.json"));
            assert!(text.contains("間隔: 30 min"));
            assert!(text.contains("アラート: color (#FF0000)"));
            assert!(text.contains("ホットキー: CTRL + ALT + R [無効]"));
        }

        #[test]
        fn test_render_debug_duration() {
            let config = ReminderConfig {
                duration_minutes: 0,
                ..ReminderConfig::default()
            };
            let text = Display::render_config(&config, Path::new("c.json"));
            assert!(text.contains("10 seconds (Debug)"));
        }
    }

    mod terminal_indicator_tests {
        use super::*;

        #[test]
        fn test_tracks_icon() {
            let mut indicator = TerminalIndicator::new();
            indicator.set_icon(IconKind::Alert);
            assert_eq!(indicator.icon, Some(IconKind::Alert));
            indicator.set_tooltip("Stand Up / Drink Water!");
            indicator.set_status_text("Time Remaining: 00:00 (Alert!)");
        }
    }
}
