//! Application wiring.
//!
//! [`ReminderApp`] connects the pieces:
//! - timer announcements → [`IndicatorFanIn`] → indicator queue
//! - 1 s status refresh → indicator queue (droppable)
//! - hotkey presses → timer reset
//! - menu actions → timer, hotkey listener, autostart, persisted config
//!
//! The app never touches the indicator directly; everything visual goes
//! through the serializer.

mod action;
mod debounce;
mod fanin;

pub use action::{MenuAction, ParseActionError};
pub use debounce::{Debouncer, RADIO_DEBOUNCE};
pub use fanin::{refresh_status, spawn_refresh, IndicatorFanIn, REFRESH_PERIOD};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::runtime::Handle;

use crate::autostart::AutostartEntry;
use crate::config::ConfigStore;
use crate::hotkey::{HotkeyBackend, HotkeyManager, PlatformBackend};
use crate::indicator::{
    CommandSender, CommandSerializer, Indicator, IndicatorSurface, Ticker, DEFAULT_CAPACITY,
};
use crate::timer::{TimerManager, TimerSnapshot};
use crate::types::{key_name, AlertStyle, HotkeyBinding, ReminderConfig, TimerPhase};

/// What the caller should do after handling an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Construction options for [`ReminderApp`].
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub config: ReminderConfig,
    /// Where settings changes are persisted; `None` keeps them in memory
    pub store: Option<ConfigStore>,
    /// Start-at-login entry; `None` disables autostart handling
    pub autostart: Option<AutostartEntry>,
    pub refresh_period: Duration,
    pub debounce: Duration,
    pub queue_capacity: usize,
}

impl AppOptions {
    pub fn new(config: ReminderConfig) -> Self {
        Self {
            config,
            store: None,
            autostart: None,
            refresh_period: REFRESH_PERIOD,
            debounce: RADIO_DEBOUNCE,
            queue_capacity: DEFAULT_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_autostart(mut self, entry: AutostartEntry) -> Self {
        self.autostart = Some(entry);
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }
}

/// Point-in-time view of the application for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStatus {
    pub timer: TimerSnapshot,
    pub alert_style: AlertStyle,
    pub hotkey_enabled: bool,
    /// Configured reset hotkey
    pub binding: HotkeyBinding,
    /// Binding of the listener that is actually registered
    pub active_binding: Option<HotkeyBinding>,
    pub hotkey_failed: bool,
    pub autostart: bool,
}

/// The running reminder.
pub struct ReminderApp<I: Indicator + 'static, B: HotkeyBackend = PlatformBackend> {
    timer: TimerManager,
    hotkeys: HotkeyManager<B>,
    sender: CommandSender<IndicatorSurface<I>>,
    serializer: Mutex<Option<CommandSerializer<IndicatorSurface<I>>>>,
    refresh: Mutex<Option<Ticker>>,
    refresh_period: Duration,
    config: Mutex<ReminderConfig>,
    store: Option<ConfigStore>,
    autostart: Option<AutostartEntry>,
    /// Shared by the duration and modifier radio groups
    radio_debounce: Debouncer,
    key_debounce: Debouncer,
    runtime: Handle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<I: Indicator + 'static, B: HotkeyBackend> ReminderApp<I, B> {
    /// Builds the app without starting it.
    ///
    /// `make_indicator` runs on the indicator thread, so the indicator
    /// itself does not need to be `Send`.
    ///
    /// # Errors
    ///
    /// Returns an error if the indicator thread cannot be started.
    pub fn new<F>(runtime: Handle, backend: B, make_indicator: F, options: AppOptions) -> Result<Self>
    where
        F: FnOnce() -> I + Send + 'static,
    {
        let style = options.config.alert_style;
        let surface_runtime = runtime.clone();
        let serializer = CommandSerializer::spawn(options.queue_capacity, move |sender| {
            IndicatorSurface::new(make_indicator(), style, surface_runtime, sender)
        })
        .context("インジケーターを起動できません")?;
        let sender = serializer.sender();

        let timer = TimerManager::new(Arc::new(IndicatorFanIn::new(sender.clone())), runtime.clone());

        let hotkey_timer = timer.clone();
        let hotkeys = HotkeyManager::new(
            backend,
            Arc::new(move || {
                tracing::info!("ホットキーでタイマーをリセットします");
                hotkey_timer.reset();
            }),
        );

        Ok(Self {
            timer,
            hotkeys,
            sender,
            serializer: Mutex::new(Some(serializer)),
            refresh: Mutex::new(None),
            refresh_period: options.refresh_period,
            config: Mutex::new(options.config),
            store: options.store,
            autostart: options.autostart,
            radio_debounce: Debouncer::new(options.debounce),
            key_debounce: Debouncer::new(options.debounce),
            runtime,
        })
    }

    /// Runs the startup sequence: stopped icon, hotkey, autostart sync,
    /// countdown, status refresh.
    ///
    /// A hotkey or autostart failure is logged and does not abort startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the indicator queue is gone.
    pub fn start(&self) -> Result<()> {
        self.sender
            .send(IndicatorSurface::show_stopped)
            .context("インジケーターに接続できません")?;

        let config = self.config();
        if config.hotkey_enabled {
            if let Err(err) = self.hotkeys.register(config.hotkey_binding()) {
                tracing::warn!(error = %err, "起動時のホットキー登録に失敗しました");
            }
        }

        if let Some(entry) = &self.autostart {
            match entry.is_enabled() {
                Ok(enabled) if enabled != config.autostart => {
                    self.update_config(|c| c.autostart = enabled);
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "自動起動の状態を確認できませんでした"),
            }
        }

        self.timer.start(config.timer_duration())?;

        let ticker = spawn_refresh(
            &self.runtime,
            self.refresh_period,
            self.timer.clone(),
            self.sender.clone(),
        );
        if let Some(mut previous) = lock(&self.refresh).replace(ticker) {
            previous.stop();
        }
        refresh_status(&self.timer, &self.sender);

        tracing::info!(
            duration_secs = config.timer_duration().as_secs(),
            hotkey = config.hotkey_enabled,
            "リマインダーを開始しました"
        );
        Ok(())
    }

    /// Applies one menu action.
    ///
    /// # Errors
    ///
    /// Returns an error if the action could not be carried out (hotkey
    /// refused, autostart entry not writable, ...). Settings are persisted
    /// even when applying them fails.
    pub fn handle(&self, action: MenuAction) -> Result<Flow> {
        tracing::debug!(action = %action, "メニュー操作を受信しました");
        match action {
            MenuAction::Toggle => self.timer.toggle(),
            MenuAction::Reset => {
                self.timer.reset();
            }
            MenuAction::SetDuration(choice) => {
                if !self.radio_debounce.accept() {
                    return Ok(Flow::Continue);
                }
                self.update_config(|c| c.duration_minutes = choice.minutes());
                self.timer.start(choice.duration())?;
            }
            MenuAction::ToggleBlink => {
                let style = self.update_config(|c| c.alert_style = c.alert_style.toggled()).alert_style;
                self.sender
                    .send(move |surface: &mut IndicatorSurface<I>| surface.set_alert_style(style))?;
            }
            MenuAction::SetModifiers(modifiers) => {
                if modifiers.is_empty() || !modifiers.is_known() {
                    bail!("使用できない修飾キーです: 0x{:04X}", modifiers.bits());
                }
                if !self.radio_debounce.accept() {
                    return Ok(Flow::Continue);
                }
                let config = self.update_config(|c| c.hotkey_modifiers = modifiers);
                self.reregister(&config)?;
            }
            MenuAction::SetResetKey(key) => {
                if key_name(key).is_none() {
                    bail!("使用できないキーです: 0x{key:02X}");
                }
                if !self.key_debounce.accept() {
                    return Ok(Flow::Continue);
                }
                let config = self.update_config(|c| c.hotkey_reset_key = key);
                self.reregister(&config)?;
            }
            MenuAction::SetHotkeyEnabled(enabled) => {
                let config = self.update_config(|c| c.hotkey_enabled = enabled);
                if enabled {
                    self.hotkeys.register(config.hotkey_binding())?;
                } else {
                    self.hotkeys.unregister()?;
                }
            }
            MenuAction::SetAutostart(enabled) => {
                self.update_config(|c| c.autostart = enabled);
                if let Some(entry) = &self.autostart {
                    entry.set_enabled(enabled)?;
                }
            }
            MenuAction::MenuOpened => {
                self.notify_menu_opened();
            }
            MenuAction::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Hook for hosts that can detect their menu being opened: resets the
    /// countdown if the reminder is alerting.
    pub fn notify_menu_opened(&self) -> bool {
        let reset = self.timer.reset_if_alerting();
        if reset {
            tracing::info!("メニューを開いたためタイマーをリセットしました");
        }
        reset
    }

    fn reregister(&self, config: &ReminderConfig) -> Result<()> {
        if config.hotkey_enabled {
            self.hotkeys.register(config.hotkey_binding())?;
        }
        Ok(())
    }

    /// Runs the shutdown sequence. Safe to call more than once.
    pub fn shutdown(&self) {
        self.timer.stop();
        if let Err(err) = self.hotkeys.unregister() {
            tracing::error!(error = %err, "終了時にホットキーを解除できませんでした");
        }
        if let Some(mut ticker) = lock(&self.refresh).take() {
            ticker.stop();
        }
        if let Some(serializer) = lock(&self.serializer).take() {
            serializer.shutdown();
            tracing::info!("リマインダーを終了しました");
        }
    }

    pub fn timer(&self) -> &TimerManager {
        &self.timer
    }

    pub fn hotkeys(&self) -> &HotkeyManager<B> {
        &self.hotkeys
    }

    /// Current settings.
    pub fn config(&self) -> ReminderConfig {
        lock(&self.config).clone()
    }

    pub fn status(&self) -> AppStatus {
        let config = self.config();
        AppStatus {
            timer: self.timer.snapshot(),
            alert_style: config.alert_style,
            hotkey_enabled: config.hotkey_enabled,
            binding: config.hotkey_binding(),
            active_binding: self.hotkeys.active_binding(),
            hotkey_failed: self.hotkeys.is_failed(),
            autostart: config.autostart,
        }
    }

    /// Waits until every indicator command queued so far has run.
    ///
    /// # Errors
    ///
    /// Returns an error if the indicator has shut down.
    pub fn flush_indicator(&self) -> Result<()> {
        self.sender.flush()?;
        Ok(())
    }

    pub fn phase(&self) -> TimerPhase {
        self.timer.phase()
    }

    fn update_config<F>(&self, apply: F) -> ReminderConfig
    where
        F: FnOnce(&mut ReminderConfig),
    {
        let config = {
            let mut config = lock(&self.config);
            apply(&mut config);
            config.clone()
        };
        if let Some(store) = &self.store {
            if let Err(err) = store.save(&config) {
                tracing::warn!(error = %err, "設定を保存できませんでした");
            }
        }
        config
    }
}

impl<I: Indicator + 'static, B: HotkeyBackend> std::fmt::Debug for ReminderApp<I, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderApp")
            .field("timer", &self.timer)
            .field("hotkeys", &self.hotkeys)
            .field("config", &self.config())
            .finish_non_exhaustive()
    }
}
