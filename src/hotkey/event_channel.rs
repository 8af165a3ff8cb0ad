//! Event-channel backend (macOS, Linux).
//!
//! Built on `global-hotkey`: the listener thread owns a
//! [`GlobalHotKeyManager`], registers the binding and then selects over its
//! own stop channel and the crate-wide hotkey event channel. Events for other
//! hotkey ids and key releases are ignored.
//!
//! On macOS the OS delivers hotkey events through the main thread's event
//! loop, so the host must keep one running for presses to arrive.

use crossbeam_channel::{bounded, select};
use global_hotkey::hotkey::{Code, HotKey, Modifiers as KeyModifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

use super::error::HotkeyError;
use super::listener::{spawn_listener, ChannelStop, ListenerHandle, PressDispatcher};
use super::HotkeyBackend;
use crate::types::{HotkeyBinding, Modifiers};

/// `global-hotkey` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventChannelBackend;

impl EventChannelBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn to_key_modifiers(modifiers: Modifiers) -> Result<KeyModifiers, HotkeyError> {
    if !modifiers.is_known() || modifiers.is_empty() {
        return Err(HotkeyError::UnsupportedModifiers(modifiers.bits()));
    }
    let table = [
        (Modifiers::ALT, KeyModifiers::ALT),
        (Modifiers::CONTROL, KeyModifiers::CONTROL),
        (Modifiers::SHIFT, KeyModifiers::SHIFT),
        (Modifiers::SUPER, KeyModifiers::SUPER),
    ];
    Ok(table
        .iter()
        .filter(|(bit, _)| modifiers.contains(*bit))
        .fold(KeyModifiers::empty(), |acc, (_, flag)| acc | *flag))
}

/// Maps a virtual key code to a physical key code.
fn to_code(vk: u32) -> Option<Code> {
    let code = match vk {
        0x30 => Code::Digit0,
        0x31 => Code::Digit1,
        0x32 => Code::Digit2,
        0x33 => Code::Digit3,
        0x34 => Code::Digit4,
        0x35 => Code::Digit5,
        0x36 => Code::Digit6,
        0x37 => Code::Digit7,
        0x38 => Code::Digit8,
        0x39 => Code::Digit9,
        0x41 => Code::KeyA,
        0x42 => Code::KeyB,
        0x43 => Code::KeyC,
        0x44 => Code::KeyD,
        0x45 => Code::KeyE,
        0x46 => Code::KeyF,
        0x47 => Code::KeyG,
        0x48 => Code::KeyH,
        0x49 => Code::KeyI,
        0x4A => Code::KeyJ,
        0x4B => Code::KeyK,
        0x4C => Code::KeyL,
        0x4D => Code::KeyM,
        0x4E => Code::KeyN,
        0x4F => Code::KeyO,
        0x50 => Code::KeyP,
        0x51 => Code::KeyQ,
        0x52 => Code::KeyR,
        0x53 => Code::KeyS,
        0x54 => Code::KeyT,
        0x55 => Code::KeyU,
        0x56 => Code::KeyV,
        0x57 => Code::KeyW,
        0x58 => Code::KeyX,
        0x59 => Code::KeyY,
        0x5A => Code::KeyZ,
        0x70 => Code::F1,
        0x71 => Code::F2,
        0x72 => Code::F3,
        0x73 => Code::F4,
        0x74 => Code::F5,
        0x75 => Code::F6,
        0x76 => Code::F7,
        0x77 => Code::F8,
        0x78 => Code::F9,
        0x79 => Code::F10,
        0x7A => Code::F11,
        0x7B => Code::F12,
        _ => return None,
    };
    Some(code)
}

impl HotkeyBackend for EventChannelBackend {
    fn name(&self) -> &'static str {
        "event-channel"
    }

    fn spawn_listener(
        &self,
        binding: HotkeyBinding,
        dispatcher: PressDispatcher,
    ) -> Result<ListenerHandle, HotkeyError> {
        let modifiers = to_key_modifiers(binding.modifiers)?;
        let code = to_code(binding.key).ok_or(HotkeyError::UnsupportedKey(binding.key))?;
        let hotkey = HotKey::new(Some(modifiers), code);

        spawn_listener(binding, dispatcher, move |ctx| {
            let manager = match GlobalHotKeyManager::new() {
                Ok(manager) => manager,
                Err(err) => {
                    let _ = ctx
                        .ready
                        .send(Err(HotkeyError::BackendUnavailable(err.to_string())));
                    return;
                }
            };

            if let Err(err) = manager.register(hotkey) {
                let _ = ctx.ready.send(Err(HotkeyError::RegistrationRejected {
                    binding,
                    reason: err.to_string(),
                }));
                return;
            }

            let (stop_tx, stop_rx) = bounded(1);
            if ctx.ready.send(Ok(Box::new(ChannelStop(stop_tx)))).is_err() {
                let _ = manager.unregister(hotkey);
                return;
            }

            let events = GlobalHotKeyEvent::receiver();
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(events) -> event => match event {
                        Ok(event) if event.id == hotkey.id() && event.state == HotKeyState::Pressed => {
                            ctx.dispatcher.dispatch();
                        }
                        Ok(_) => {}
                        Err(_) => {
                            tracing::error!("ホットキーイベントチャネルが閉じました");
                            break;
                        }
                    },
                }
            }

            if let Err(err) = manager.unregister(hotkey) {
                tracing::warn!(binding = %binding, error = %err, "ホットキーの登録解除に失敗しました");
            }
            drop(manager);
            let _ = ctx.done.send(());
        })
    }
}
