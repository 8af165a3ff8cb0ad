//! Global reset hotkey.
//!
//! This module provides the listener lifecycle:
//! - [`HotkeyManager`]: owns at most one active listener and replaces it with
//!   a blocking stop-then-start handshake
//! - [`HotkeyBackend`]: the OS shortcut service, one implementation per host
//! - [`MockHotkeyBackend`]: a simulated OS for tests
//!
//! Windows hosts use the message-loop backend (`RegisterHotKey` plus a
//! `GetMessageW` loop on the listener thread); every other host uses the
//! event-channel backend built on `global-hotkey`.

mod error;
mod listener;
mod mock;

#[cfg(not(target_os = "windows"))]
mod event_channel;
#[cfg(target_os = "windows")]
mod message_loop;

pub use error::HotkeyError;
pub use listener::{
    spawn_listener, ChannelStop, ListenerContext, ListenerHandle, PressCallback, PressDispatcher,
    StopSignal,
};
pub use mock::MockHotkeyBackend;

#[cfg(not(target_os = "windows"))]
pub use event_channel::EventChannelBackend;
#[cfg(target_os = "windows")]
pub use message_loop::MessageLoopBackend;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::types::HotkeyBinding;

/// Backend compiled in for this host.
#[cfg(target_os = "windows")]
pub type PlatformBackend = MessageLoopBackend;

/// Backend compiled in for this host.
#[cfg(not(target_os = "windows"))]
pub type PlatformBackend = EventChannelBackend;

/// Default bound on the termination handshake.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// HotkeyBackend
// ============================================================================

/// An OS shortcut service.
///
/// `spawn_listener` must block until the new listener either holds the OS
/// registration or has failed and exited. The returned handle's stop signal
/// must make the listener release the registration and exit promptly.
pub trait HotkeyBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Starts a listener for `binding` that forwards presses to `dispatcher`.
    ///
    /// # Errors
    ///
    /// Returns a registration error if the binding cannot be represented on
    /// this host or the OS declines it. No listener is left running.
    fn spawn_listener(
        &self,
        binding: HotkeyBinding,
        dispatcher: PressDispatcher,
    ) -> Result<ListenerHandle, HotkeyError>;
}

// ============================================================================
// HotkeyManager
// ============================================================================

enum ListenerSlot {
    Idle,
    Active(ListenerHandle),
    /// A listener could not be confirmed stopped
    Failed,
}

/// Owns the single active global-hotkey listener.
///
/// `register` and `unregister` block until the previous listener confirmed
/// its termination. Once either returns, the callback is not invoked on
/// behalf of the replaced listener again.
///
/// The confirmation wait is bounded by the stop timeout. Closing the
/// dispatcher gate before it is not: a callback already running is allowed
/// to finish first (see [`PressDispatcher`]).
pub struct HotkeyManager<B: HotkeyBackend = PlatformBackend> {
    backend: B,
    callback: PressCallback,
    slot: Mutex<ListenerSlot>,
    stop_timeout: Duration,
}

impl<B: HotkeyBackend> HotkeyManager<B> {
    /// Creates a manager with no active listener.
    pub fn new(backend: B, callback: PressCallback) -> Self {
        Self {
            backend,
            callback,
            slot: Mutex::new(ListenerSlot::Idle),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Overrides the termination handshake bound.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ListenerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the active listener (if any) with one bound to `binding`.
    ///
    /// The previous listener is torn down first and is not restored if the
    /// new registration fails.
    ///
    /// # Errors
    ///
    /// Returns a registration error if the new binding is refused, or a fatal
    /// error if the previous listener could not be stopped.
    pub fn register(&self, binding: HotkeyBinding) -> Result<(), HotkeyError> {
        let mut slot = self.lock();
        self.stop_active(&mut slot)?;

        let dispatcher = PressDispatcher::new(Arc::clone(&self.callback));
        match self.backend.spawn_listener(binding, dispatcher) {
            Ok(handle) => {
                tracing::info!(binding = %binding, backend = self.backend.name(), "ホットキーを登録しました");
                *slot = ListenerSlot::Active(handle);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(binding = %binding, error = %err, "ホットキーの登録に失敗しました");
                Err(err)
            }
        }
    }

    /// Stops the active listener. No-op if none is active.
    ///
    /// # Errors
    ///
    /// Returns a fatal error if the listener could not be stopped.
    pub fn unregister(&self) -> Result<(), HotkeyError> {
        let mut slot = self.lock();
        self.stop_active(&mut slot)
    }

    fn stop_active(&self, slot: &mut ListenerSlot) -> Result<(), HotkeyError> {
        match std::mem::replace(slot, ListenerSlot::Idle) {
            ListenerSlot::Idle => Ok(()),
            ListenerSlot::Failed => {
                *slot = ListenerSlot::Failed;
                Err(HotkeyError::SubsystemFailed)
            }
            ListenerSlot::Active(handle) => {
                let binding = handle.binding();
                match handle.shutdown(self.stop_timeout) {
                    Ok(()) => {
                        tracing::info!(binding = %binding, "ホットキーを解除しました");
                        Ok(())
                    }
                    Err(err) => {
                        tracing::error!(binding = %binding, error = %err, "ホットキーリスナーを停止できませんでした");
                        *slot = ListenerSlot::Failed;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Binding of the active listener, if any.
    pub fn active_binding(&self) -> Option<HotkeyBinding> {
        match &*self.lock() {
            ListenerSlot::Active(handle) => Some(handle.binding()),
            _ => None,
        }
    }

    /// Returns true once a listener could not be stopped.
    pub fn is_failed(&self) -> bool {
        matches!(&*self.lock(), ListenerSlot::Failed)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: HotkeyBackend> Drop for HotkeyManager<B> {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let ListenerSlot::Active(handle) = std::mem::replace(slot, ListenerSlot::Idle) {
            if let Err(err) = handle.shutdown(self.stop_timeout) {
                tracing::error!(error = %err, "終了時にホットキーリスナーを停止できませんでした");
            }
        }
    }
}

impl<B: HotkeyBackend> std::fmt::Debug for HotkeyManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotkeyManager")
            .field("backend", &self.backend.name())
            .field("active", &self.active_binding())
            .field("failed", &self.is_failed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Modifiers;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn ctrl_alt_r() -> HotkeyBinding {
        HotkeyBinding::letter(Modifiers::CONTROL | Modifiers::ALT, 'R')
    }

    fn ctrl_shift_r() -> HotkeyBinding {
        HotkeyBinding::letter(Modifiers::CONTROL | Modifiers::SHIFT, 'R')
    }

    fn create_manager() -> (
        HotkeyManager<MockHotkeyBackend>,
        MockHotkeyBackend,
        Arc<AtomicUsize>,
    ) {
        let backend = MockHotkeyBackend::new();
        let presses = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&presses);
        let manager = HotkeyManager::new(
            backend.clone(),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (manager, backend, presses)
    }

    /// Waits until the listener threads drained their queues.
    fn settle() {
        thread::sleep(Duration::from_millis(50));
    }

    mod register_tests {
        use super::*;

        #[test]
        fn test_register_forwards_presses() {
            let (manager, backend, presses) = create_manager();
            manager.register(ctrl_alt_r()).unwrap();

            assert_eq!(manager.active_binding(), Some(ctrl_alt_r()));
            assert_eq!(backend.press(ctrl_alt_r()), 1);
            settle();
            assert_eq!(presses.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn test_replace_releases_old_binding() {
            let (manager, backend, presses) = create_manager();
            manager.register(ctrl_alt_r()).unwrap();
            manager.register(ctrl_shift_r()).unwrap();

            assert_eq!(backend.registered(), vec![ctrl_shift_r()]);
            assert_eq!(backend.press(ctrl_alt_r()), 0);
            settle();
            assert_eq!(presses.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn test_rejected_binding_leaves_nothing_active() {
            let (manager, backend, _presses) = create_manager();
            manager.register(ctrl_alt_r()).unwrap();
            backend.claim(ctrl_shift_r());

            let err = manager.register(ctrl_shift_r()).unwrap_err();
            assert!(matches!(err, HotkeyError::RegistrationRejected { .. }));
            assert_eq!(manager.active_binding(), None);
            assert!(backend.registered().is_empty());
            assert!(!manager.is_failed());
        }

        #[test]
        fn test_unsupported_key() {
            let (manager, _backend, _presses) = create_manager();
            let binding = HotkeyBinding::new(Modifiers::CONTROL, 0x20);
            assert_eq!(
                manager.register(binding),
                Err(HotkeyError::UnsupportedKey(0x20))
            );
        }

        #[test]
        fn test_unsupported_modifiers() {
            let (manager, _backend, _presses) = create_manager();
            let binding = HotkeyBinding::new(Modifiers::from_bits(0x4000), 0x52);
            assert_eq!(
                manager.register(binding),
                Err(HotkeyError::UnsupportedModifiers(0x4000))
            );
        }

        #[test]
        fn test_register_same_binding_again() {
            let (manager, backend, _presses) = create_manager();
            manager.register(ctrl_alt_r()).unwrap();
            manager.register(ctrl_alt_r()).unwrap();
            assert_eq!(backend.registered(), vec![ctrl_alt_r()]);
        }
    }

    mod unregister_tests {
        use super::*;

        #[test]
        fn test_unregister_without_listener_is_noop() {
            let (manager, _backend, _presses) = create_manager();
            assert!(manager.unregister().is_ok());
            assert!(manager.unregister().is_ok());
        }

        #[test]
        fn test_unregister_releases_binding() {
            let (manager, backend, presses) = create_manager();
            manager.register(ctrl_alt_r()).unwrap();
            manager.unregister().unwrap();

            assert_eq!(manager.active_binding(), None);
            assert!(backend.registered().is_empty());
            assert_eq!(backend.press(ctrl_alt_r()), 0);
            assert_eq!(presses.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn test_stop_failure_is_fatal() {
            let (manager, backend, _presses) = create_manager();
            manager.register(ctrl_alt_r()).unwrap();
            backend.set_fail_stop(true);

            assert!(manager.unregister().unwrap_err().is_fatal());
            assert!(manager.is_failed());
            assert_eq!(
                manager.register(ctrl_shift_r()),
                Err(HotkeyError::SubsystemFailed)
            );
            assert_eq!(manager.unregister(), Err(HotkeyError::SubsystemFailed));
        }

        #[test]
        fn test_drop_unregisters() {
            let (manager, backend, _presses) = create_manager();
            manager.register(ctrl_alt_r()).unwrap();
            drop(manager);
            assert!(backend.registered().is_empty());
        }
    }
}
