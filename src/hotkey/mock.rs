//! In-process hotkey backend for tests.
//!
//! [`MockHotkeyBackend`] simulates the OS side: it keeps a table of
//! registered bindings, can pretend a binding is claimed by another process,
//! and delivers simulated presses to whichever listener currently holds a
//! binding. Listeners run on real threads and follow the same handshake as
//! the platform backends.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{unbounded, Sender};

use super::error::HotkeyError;
use super::listener::{spawn_listener, ListenerHandle, PressDispatcher, StopSignal};
use super::HotkeyBackend;
use crate::types::HotkeyBinding;

enum MockMessage {
    Press,
    Stop,
}

struct MockRegistration {
    id: u64,
    binding: HotkeyBinding,
    tx: Sender<MockMessage>,
}

#[derive(Default)]
struct MockOs {
    registrations: Mutex<Vec<MockRegistration>>,
    claimed: Mutex<HashSet<HotkeyBinding>>,
    fail_stop: AtomicBool,
    next_id: AtomicU64,
}

impl MockOs {
    fn remove(&self, id: u64) {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|r| r.id != id);
    }
}

/// Simulated shortcut backend.
///
/// Clones share the same simulated OS.
#[derive(Clone, Default)]
pub struct MockHotkeyBackend {
    os: Arc<MockOs>,
}

impl MockHotkeyBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretends another process owns `binding`.
    pub fn claim(&self, binding: HotkeyBinding) {
        self.os
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(binding);
    }

    pub fn release(&self, binding: HotkeyBinding) {
        self.os
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&binding);
    }

    /// Makes every following stop signal fail to deliver.
    pub fn set_fail_stop(&self, fail: bool) {
        self.os.fail_stop.store(fail, Ordering::SeqCst);
    }

    /// Simulates the user pressing `binding`.
    ///
    /// Returns how many listeners the press was delivered to.
    pub fn press(&self, binding: HotkeyBinding) -> usize {
        let registrations = self
            .os
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registrations
            .iter()
            .filter(|r| r.binding == binding)
            .filter(|r| r.tx.send(MockMessage::Press).is_ok())
            .count()
    }

    /// Bindings currently registered with the simulated OS.
    #[must_use]
    pub fn registered(&self) -> Vec<HotkeyBinding> {
        self.os
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.binding)
            .collect()
    }
}

impl std::fmt::Debug for MockHotkeyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHotkeyBackend")
            .field("registered", &self.registered())
            .finish_non_exhaustive()
    }
}

struct MockStop {
    tx: Sender<MockMessage>,
    os: Arc<MockOs>,
}

impl StopSignal for MockStop {
    fn signal(&mut self) -> Result<(), HotkeyError> {
        if self.os.fail_stop.load(Ordering::SeqCst) {
            return Err(HotkeyError::StopSignalFailed(
                "simulated delivery failure".to_string(),
            ));
        }
        self.tx
            .send(MockMessage::Stop)
            .map_err(|_| HotkeyError::StopSignalFailed("listener queue closed".to_string()))
    }
}

impl HotkeyBackend for MockHotkeyBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn spawn_listener(
        &self,
        binding: HotkeyBinding,
        dispatcher: PressDispatcher,
    ) -> Result<ListenerHandle, HotkeyError> {
        if !binding.modifiers.is_known() || binding.modifiers.is_empty() {
            return Err(HotkeyError::UnsupportedModifiers(binding.modifiers.bits()));
        }
        if !binding.is_supported() {
            return Err(HotkeyError::UnsupportedKey(binding.key));
        }

        let os = Arc::clone(&self.os);
        spawn_listener(binding, dispatcher, move |ctx| {
            let claimed = os
                .claimed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&binding);
            if claimed {
                let _ = ctx.ready.send(Err(HotkeyError::RegistrationRejected {
                    binding,
                    reason: "already registered by another process".to_string(),
                }));
                return;
            }

            let (tx, rx) = unbounded();
            let id = os.next_id.fetch_add(1, Ordering::SeqCst);
            os.registrations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(MockRegistration {
                    id,
                    binding,
                    tx: tx.clone(),
                });

            let stop = MockStop {
                tx,
                os: Arc::clone(&os),
            };
            if ctx.ready.send(Ok(Box::new(stop))).is_err() {
                os.remove(id);
                return;
            }

            for message in rx {
                match message {
                    MockMessage::Press => {
                        ctx.dispatcher.dispatch();
                    }
                    MockMessage::Stop => break,
                }
            }

            os.remove(id);
            let _ = ctx.done.send(());
        })
    }
}
