//! Consumer-side presenter.

use std::time::Duration;

use tokio::runtime::Handle;

use super::error::SerializerError;
use super::serializer::CommandSender;
use super::ticker::Ticker;
use super::Indicator;
use crate::timer::Stamp;
use crate::types::{AlertStyle, IconKind, TimerPhase};

/// Interval between icon flips while blinking.
pub const BLINK_PERIOD: Duration = Duration::from_millis(500);

pub const TOOLTIP_STOPPED: &str = "HydraReminder - Stopped";
pub const TOOLTIP_RUNNING: &str = "HydraReminder - Running";
pub const TOOLTIP_ALERT: &str = "Stand Up / Drink Water!";

/// Formats the "time remaining" status line.
///
/// Minutes are not wrapped at 60; partial seconds are truncated.
pub fn format_status_text(phase: TimerPhase, remaining: Duration) -> String {
    match phase {
        TimerPhase::Stopped => "Time Remaining: Stopped".to_string(),
        TimerPhase::Alerting => "Time Remaining: 00:00 (Alert!)".to_string(),
        TimerPhase::Running => {
            let total = remaining.as_secs();
            format!("Time Remaining: {:02}:{:02}", total / 60, total % 60)
        }
    }
}

/// Presents timer state on an [`Indicator`].
///
/// Lives on the serializer's consumer thread; every method is called from a
/// queued command.
pub struct IndicatorSurface<I: Indicator + 'static> {
    indicator: I,
    alert_style: AlertStyle,
    blink: Option<Ticker>,
    /// Incremented per blink start; ticks from older sessions are ignored
    blink_session: u64,
    blink_shows_alert: bool,
    /// Newest timer announcement applied so far
    latest: Option<Stamp>,
    runtime: Handle,
    sender: CommandSender<IndicatorSurface<I>>,
}

impl<I: Indicator + 'static> IndicatorSurface<I> {
    pub fn new(
        indicator: I,
        alert_style: AlertStyle,
        runtime: Handle,
        sender: CommandSender<IndicatorSurface<I>>,
    ) -> Self {
        Self {
            indicator,
            alert_style,
            blink: None,
            blink_session: 0,
            blink_shows_alert: false,
            latest: None,
            runtime,
            sender,
        }
    }

    pub fn show_running(&mut self) {
        self.stop_blink();
        self.indicator.set_icon(IconKind::Running);
        self.indicator.set_tooltip(TOOLTIP_RUNNING);
    }

    pub fn show_alert(&mut self) {
        self.stop_blink();
        match self.alert_style {
            AlertStyle::Color => self.indicator.set_icon(IconKind::Alert),
            AlertStyle::Blink => self.start_blink(),
        }
        self.indicator.set_tooltip(TOOLTIP_ALERT);
    }

    pub fn show_stopped(&mut self) {
        self.stop_blink();
        self.indicator.set_icon(IconKind::Stopped);
        self.indicator.set_tooltip(TOOLTIP_STOPPED);
    }

    /// Records a timer announcement. Returns false if a newer one was
    /// already applied, in which case the caller must not present it.
    pub fn accept(&mut self, stamp: Stamp) -> bool {
        match self.latest {
            Some(latest) if stamp < latest => {
                tracing::debug!(
                    generation = stamp.generation(),
                    latest = latest.generation(),
                    "古いタイマー通知を破棄しました"
                );
                false
            }
            _ => {
                self.latest = Some(stamp);
                true
            }
        }
    }

    pub fn set_status_text(&mut self, text: &str) {
        self.indicator.set_status_text(text);
    }

    /// Changes the style used by the next alert.
    pub fn set_alert_style(&mut self, style: AlertStyle) {
        self.alert_style = style;
    }

    pub fn alert_style(&self) -> AlertStyle {
        self.alert_style
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.as_ref().is_some_and(Ticker::is_active)
    }

    fn start_blink(&mut self) {
        self.blink_session = self.blink_session.wrapping_add(1);
        self.blink_shows_alert = true;
        self.indicator.set_icon(IconKind::Alert);

        let session = self.blink_session;
        let sender = self.sender.clone();
        self.blink = Some(Ticker::start(
            &self.runtime,
            BLINK_PERIOD,
            move || match sender.try_send(move |surface: &mut Self| surface.blink_tick(session)) {
                Ok(()) | Err(SerializerError::Disconnected) => {}
                Err(err) => tracing::debug!(error = %err, "点滅ティックを破棄しました"),
            },
        ));
        tracing::debug!(session, "点滅を開始しました");
    }

    /// Stops the blink tick if one is running. Returns true if it was.
    fn stop_blink(&mut self) -> bool {
        match self.blink.take() {
            Some(mut blink) => {
                let stopped = blink.stop();
                if stopped {
                    tracing::debug!(session = self.blink_session, "点滅を停止しました");
                }
                stopped
            }
            None => false,
        }
    }

    fn blink_tick(&mut self, session: u64) {
        if session != self.blink_session || !self.is_blinking() {
            tracing::debug!(session, "古い点滅ティックを破棄しました");
            return;
        }
        self.blink_shows_alert = !self.blink_shows_alert;
        let icon = if self.blink_shows_alert {
            IconKind::Alert
        } else {
            IconKind::Running
        };
        self.indicator.set_icon(icon);
    }
}

impl<I: Indicator + 'static> Drop for IndicatorSurface<I> {
    fn drop(&mut self) {
        self.stop_blink();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::{CommandSerializer, MockIndicator};
    use crate::timer::{MockTimerObserver, TimerManager};
    use std::sync::Arc;

    fn spawn_surface(
        style: AlertStyle,
    ) -> (
        CommandSerializer<IndicatorSurface<MockIndicator>>,
        CommandSender<IndicatorSurface<MockIndicator>>,
        MockIndicator,
    ) {
        let mock = MockIndicator::new();
        let indicator = mock.clone();
        let runtime = Handle::current();
        let serializer = CommandSerializer::spawn(32, move |sender| {
            IndicatorSurface::new(indicator, style, runtime, sender)
        })
        .unwrap();
        let sender = serializer.sender();
        (serializer, sender, mock)
    }

    mod status_text_tests {
        use super::*;

        #[test]
        fn test_format_status_text() {
            assert_eq!(
                format_status_text(TimerPhase::Stopped, Duration::ZERO),
                "Time Remaining: Stopped"
            );
            assert_eq!(
                format_status_text(TimerPhase::Alerting, Duration::ZERO),
                "Time Remaining: 00:00 (Alert!)"
            );
            assert_eq!(
                format_status_text(TimerPhase::Running, Duration::from_millis(65_900)),
                "Time Remaining: 01:05"
            );
        }

        #[test]
        fn test_minutes_not_wrapped() {
            assert_eq!(
                format_status_text(TimerPhase::Running, Duration::from_secs(3600)),
                "Time Remaining: 60:00"
            );
        }
    }

    mod presentation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_color_alert_swaps_icon_once() {
            let (serializer, sender, mock) = spawn_surface(AlertStyle::Color);
            sender.send(|s| s.show_running()).unwrap();
            sender.send(|s| s.show_alert()).unwrap();
            sender.flush().unwrap();

            tokio::time::sleep(Duration::from_secs(2)).await;
            sender.flush().unwrap();

            assert_eq!(mock.icons(), vec![IconKind::Running, IconKind::Alert]);
            assert_eq!(mock.last_tooltip().as_deref(), Some(TOOLTIP_ALERT));
            serializer.shutdown();
        }

        #[tokio::test(start_paused = true)]
        async fn test_blink_alternates_icons() {
            let (serializer, sender, mock) = spawn_surface(AlertStyle::Blink);
            sender.send(|s| s.show_alert()).unwrap();
            sender.flush().unwrap();

            tokio::time::sleep(Duration::from_millis(2100)).await;
            sender.flush().unwrap();

            assert_eq!(
                mock.icons(),
                vec![
                    IconKind::Alert,
                    IconKind::Running,
                    IconKind::Alert,
                    IconKind::Running,
                    IconKind::Alert,
                ]
            );
            serializer.shutdown();
        }

        #[tokio::test(start_paused = true)]
        async fn test_leaving_alert_stops_blink() {
            let (serializer, sender, mock) = spawn_surface(AlertStyle::Blink);
            sender.send(|s| s.show_alert()).unwrap();
            sender.flush().unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;

            sender.send(|s| s.show_stopped()).unwrap();
            sender.flush().unwrap();
            mock.clear();

            tokio::time::sleep(Duration::from_secs(3)).await;
            sender.flush().unwrap();
            assert!(mock.icons().is_empty());
            serializer.shutdown();
        }

        #[tokio::test(start_paused = true)]
        async fn test_stale_tick_is_ignored() {
            let (serializer, sender, mock) = spawn_surface(AlertStyle::Blink);
            sender.send(|s| s.show_alert()).unwrap();
            sender
                .send(|s| {
                    let stale = s.blink_session;
                    s.show_alert();
                    s.blink_tick(stale);
                })
                .unwrap();
            sender.flush().unwrap();

            assert_eq!(mock.icons(), vec![IconKind::Alert, IconKind::Alert]);
            serializer.shutdown();
        }

        #[tokio::test(start_paused = true)]
        async fn test_alert_older_than_stop_is_not_shown() {
            let (serializer, sender, mock) = spawn_surface(AlertStyle::Blink);
            let observer = Arc::new(MockTimerObserver::new());
            let timer = TimerManager::new(observer.clone(), Handle::current());
            timer.start(Duration::from_secs(1)).unwrap();
            tokio::time::sleep(Duration::from_millis(1100)).await;
            timer.stop();
            let stamped = observer.stamped();
            let (running, alert, stop) = (stamped[0].1, stamped[1].1, stamped[2].1);

            // The stop overtook the alert on its way to the queue
            sender
                .send(move |s| {
                    if s.accept(running) {
                        s.show_running();
                    }
                    if s.accept(stop) {
                        s.show_stopped();
                    }
                    if s.accept(alert) {
                        s.show_alert();
                    }
                })
                .unwrap();
            sender.flush().unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            sender.flush().unwrap();

            assert_eq!(mock.icons(), vec![IconKind::Running, IconKind::Stopped]);
            assert_eq!(mock.last_tooltip().as_deref(), Some(TOOLTIP_STOPPED));
            serializer.shutdown();
        }

        #[tokio::test(start_paused = true)]
        async fn test_style_change_applies_to_next_alert() {
            let (serializer, sender, mock) = spawn_surface(AlertStyle::Color);
            sender
                .send(|s| {
                    s.set_alert_style(AlertStyle::Blink);
                    s.show_alert();
                    assert!(s.is_blinking());
                    s.show_running();
                    assert!(!s.is_blinking());
                })
                .unwrap();
            sender.flush().unwrap();

            assert_eq!(
                mock.icons(),
                vec![IconKind::Alert, IconKind::Running]
            );
            serializer.shutdown();
        }
    }
}
