//! Message-loop backend (Windows).
//!
//! The listener thread owns a Win32 message queue. It registers the hotkey
//! for the thread (`RegisterHotKey` with a null window), pumps `GetMessageW`
//! and dispatches every `WM_HOTKEY`. A posted `WM_QUIT` ends the loop, after
//! which the thread releases the registration and raises its completion
//! signal.

use std::io;
use std::ptr::null_mut;

use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT, MOD_WIN,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetMessageW, PeekMessageW, PostThreadMessageW, MSG, PM_NOREMOVE, WM_HOTKEY, WM_QUIT, WM_USER,
};

use super::error::HotkeyError;
use super::listener::{spawn_listener, ListenerHandle, PressDispatcher, StopSignal};
use super::HotkeyBackend;
use crate::types::{HotkeyBinding, Modifiers};

/// Identifier of the single thread-level hotkey registration.
const HOTKEY_ID: i32 = 1;

/// Win32 `RegisterHotKey` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageLoopBackend;

impl MessageLoopBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn to_win32_modifiers(modifiers: Modifiers) -> Result<HOT_KEY_MODIFIERS, HotkeyError> {
    if !modifiers.is_known() || modifiers.is_empty() {
        return Err(HotkeyError::UnsupportedModifiers(modifiers.bits()));
    }
    let table = [
        (Modifiers::ALT, MOD_ALT),
        (Modifiers::CONTROL, MOD_CONTROL),
        (Modifiers::SHIFT, MOD_SHIFT),
        (Modifiers::SUPER, MOD_WIN),
    ];
    Ok(table
        .iter()
        .filter(|(bit, _)| modifiers.contains(*bit))
        .fold(MOD_NOREPEAT, |acc, (_, flag)| acc | flag))
}

/// Posts `WM_QUIT` to the listener thread.
struct ThreadMessageStop {
    thread_id: u32,
}

impl StopSignal for ThreadMessageStop {
    fn signal(&mut self) -> Result<(), HotkeyError> {
        let posted = unsafe {
            // Safety:
            // - Posting to a thread id has no memory effects on this side.
            PostThreadMessageW(self.thread_id, WM_QUIT, 0, 0)
        };
        if posted == 0 {
            return Err(HotkeyError::StopSignalFailed(
                io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }
}

fn release_registration() {
    let released = unsafe {
        // Safety:
        // - Called on the thread that registered `HOTKEY_ID`.
        UnregisterHotKey(null_mut(), HOTKEY_ID)
    };
    if released == 0 {
        tracing::warn!(error = %io::Error::last_os_error(), "UnregisterHotKey に失敗しました");
    }
}

impl HotkeyBackend for MessageLoopBackend {
    fn name(&self) -> &'static str {
        "message-loop"
    }

    fn spawn_listener(
        &self,
        binding: HotkeyBinding,
        dispatcher: PressDispatcher,
    ) -> Result<ListenerHandle, HotkeyError> {
        let modifiers = to_win32_modifiers(binding.modifiers)?;
        if !binding.is_supported() {
            return Err(HotkeyError::UnsupportedKey(binding.key));
        }

        spawn_listener(binding, dispatcher, move |ctx| {
            let thread_id = unsafe {
                // Safety:
                // - No preconditions.
                GetCurrentThreadId()
            };
            let mut message: MSG = unsafe {
                // Safety:
                // - Zero-initialization before first `PeekMessageW` is valid.
                std::mem::zeroed()
            };
            unsafe {
                // Safety:
                // - `message` is a valid, writable MSG.
                // - Creates this thread's queue so a later `WM_QUIT` is not lost.
                PeekMessageW(&mut message, null_mut(), WM_USER, WM_USER, PM_NOREMOVE);
            }

            let registered = unsafe {
                // Safety:
                // - A null window binds the hotkey to this thread's queue.
                RegisterHotKey(null_mut(), HOTKEY_ID, modifiers, binding.key)
            };
            if registered == 0 {
                let _ = ctx.ready.send(Err(HotkeyError::RegistrationRejected {
                    binding,
                    reason: io::Error::last_os_error().to_string(),
                }));
                return;
            }

            if ctx
                .ready
                .send(Ok(Box::new(ThreadMessageStop { thread_id })))
                .is_err()
            {
                release_registration();
                return;
            }

            loop {
                let result = unsafe {
                    // Safety:
                    // - `message` pointer remains valid across loop iterations.
                    GetMessageW(&mut message, null_mut(), 0, 0)
                };
                if result == -1 {
                    tracing::error!(error = %io::Error::last_os_error(), "GetMessageW に失敗しました");
                    break;
                }
                if result == 0 {
                    break;
                }
                if message.message == WM_HOTKEY && message.wParam == HOTKEY_ID as usize {
                    ctx.dispatcher.dispatch();
                }
            }

            release_registration();
            let _ = ctx.done.send(());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_mapping() {
        let mods = to_win32_modifiers(Modifiers::CONTROL | Modifiers::ALT).unwrap();
        assert_eq!(mods, MOD_CONTROL | MOD_ALT | MOD_NOREPEAT);

        let mods = to_win32_modifiers(Modifiers::SUPER | Modifiers::SHIFT).unwrap();
        assert_eq!(mods, MOD_WIN | MOD_SHIFT | MOD_NOREPEAT);
    }

    #[test]
    fn test_modifier_mapping_rejects_unknown() {
        assert_eq!(
            to_win32_modifiers(Modifiers::from_bits(0x0100)),
            Err(HotkeyError::UnsupportedModifiers(0x0100))
        );
        assert_eq!(
            to_win32_modifiers(Modifiers::NONE),
            Err(HotkeyError::UnsupportedModifiers(0))
        );
    }
}
