//! Listener handle and the stop/start handshake.
//!
//! Every backend runs its listener on a dedicated thread created through
//! [`spawn_listener`]. The thread reports its registration result over a
//! ready channel before the caller returns, and raises a completion signal
//! only after it released the OS registration.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::error::HotkeyError;
use crate::types::HotkeyBinding;

/// Callback run for every accepted shortcut press.
pub type PressCallback = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// PressDispatcher
// ============================================================================

/// Gate between one listener thread and the press callback.
///
/// The gate is closed before the listener is told to stop. Closing takes the
/// same lock a dispatch holds while the callback runs, so once `close`
/// returns no invocation is in flight and none will start.
///
/// A consequence is that closing waits for a running callback to finish,
/// with no timeout. The reminder's callback may block on the indicator
/// queue, so `register` and `unregister` can wait for that queue to drain
/// before the bounded stop handshake even begins.
#[derive(Clone)]
pub struct PressDispatcher {
    callback: PressCallback,
    open: Arc<Mutex<bool>>,
}

impl PressDispatcher {
    pub fn new(callback: PressCallback) -> Self {
        Self {
            callback,
            open: Arc::new(Mutex::new(true)),
        }
    }

    /// Runs the callback if this listener is still the active one.
    ///
    /// Returns whether the callback ran.
    pub fn dispatch(&self) -> bool {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            tracing::debug!("停止済みリスナーへのキー入力を破棄しました");
            return false;
        }
        (self.callback)();
        true
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn close(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

impl std::fmt::Debug for PressDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PressDispatcher")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StopSignal
// ============================================================================

/// Backend-specific way of asking a listener thread to exit.
pub trait StopSignal: Send {
    /// Delivers the stop request. Must not block on the listener.
    fn signal(&mut self) -> Result<(), HotkeyError>;
}

/// Stop signal for listeners that select on a crossbeam channel.
pub struct ChannelStop(pub Sender<()>);

impl StopSignal for ChannelStop {
    fn signal(&mut self) -> Result<(), HotkeyError> {
        self.0
            .try_send(())
            .or_else(|err| match err {
                // A stop is already queued
                crossbeam_channel::TrySendError::Full(()) => Ok(()),
                crossbeam_channel::TrySendError::Disconnected(()) => Err(
                    HotkeyError::StopSignalFailed("停止チャネルが閉じています".to_string()),
                ),
            })
    }
}

// ============================================================================
// ListenerHandle
// ============================================================================

/// The currently active background listener.
///
/// Owned exclusively by [`HotkeyManager`](super::HotkeyManager).
pub struct ListenerHandle {
    binding: HotkeyBinding,
    dispatcher: PressDispatcher,
    stop: Box<dyn StopSignal>,
    done: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn binding(&self) -> HotkeyBinding {
        self.binding
    }

    /// Stops the listener and waits for its completion signal.
    ///
    /// # Errors
    ///
    /// Returns a fatal error if the stop signal cannot be delivered to a
    /// running listener or the listener does not confirm within `timeout`.
    pub(crate) fn shutdown(mut self, timeout: Duration) -> Result<(), HotkeyError> {
        self.dispatcher.close();

        if let Err(err) = self.stop.signal() {
            match self.done.try_recv() {
                // The listener had already exited on its own
                Ok(()) | Err(TryRecvError::Disconnected) => {}
                Err(TryRecvError::Empty) => return Err(err),
            }
        } else {
            match self.done.recv_timeout(timeout) {
                Ok(()) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!(binding = %self.binding, "リスナーが完了通知なしに終了しました");
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(HotkeyError::TerminationTimeout(timeout));
                }
            }
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!(binding = %self.binding, "リスナースレッドがパニックしました");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("binding", &self.binding)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// spawn_listener
// ============================================================================

/// Channels handed to a listener thread body.
pub struct ListenerContext {
    /// Send exactly once: the stop signal on success, the error otherwise.
    pub ready: Sender<Result<Box<dyn StopSignal>, HotkeyError>>,
    /// Send after the OS registration has been released.
    pub done: Sender<()>,
    pub dispatcher: PressDispatcher,
}

/// Spawns a listener thread and blocks until it reports its registration.
///
/// On failure the thread is joined before returning, so no listener is left
/// behind.
pub fn spawn_listener<F>(
    binding: HotkeyBinding,
    dispatcher: PressDispatcher,
    body: F,
) -> Result<ListenerHandle, HotkeyError>
where
    F: FnOnce(ListenerContext) + Send + 'static,
{
    let (ready_tx, ready_rx) = bounded(1);
    let (done_tx, done_rx) = bounded(1);
    let context = ListenerContext {
        ready: ready_tx,
        done: done_tx,
        dispatcher: dispatcher.clone(),
    };

    let thread = thread::Builder::new()
        .name("hotkey-listener".to_string())
        .spawn(move || body(context))
        .map_err(|err| HotkeyError::SpawnFailed(err.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(stop)) => Ok(ListenerHandle {
            binding,
            dispatcher,
            stop,
            done: done_rx,
            thread: Some(thread),
        }),
        Ok(Err(err)) => {
            let _ = thread.join();
            Err(err)
        }
        Err(_) => {
            let _ = thread.join();
            Err(HotkeyError::ListenerDied)
        }
    }
}
