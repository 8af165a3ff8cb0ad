//! Hotkey listener error types.
//!
//! Registration failures are reported to the caller and leave no listener
//! behind. Termination failures are fatal to the listener subsystem: a
//! listener that cannot be stopped could still hold a stale callback.

use std::time::Duration;

use thiserror::Error;

use crate::types::HotkeyBinding;

/// Errors that can occur while registering or unregistering the global hotkey.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HotkeyError {
    /// The key code has no equivalent on this host.
    #[error("キーコード 0x{0:02X} はこのホストでは使用できません")]
    UnsupportedKey(u32),

    /// The modifier mask has no equivalent on this host.
    #[error("修飾キー 0x{0:04X} はこのホストでは使用できません")]
    UnsupportedModifiers(u32),

    /// The OS declined the binding (e.g. claimed by another process).
    #[error("ホットキー {binding} の登録がOSに拒否されました: {reason}")]
    RegistrationRejected {
        binding: HotkeyBinding,
        reason: String,
    },

    /// The OS shortcut service could not be initialised.
    #[error("ホットキーバックエンドを初期化できません: {0}")]
    BackendUnavailable(String),

    /// The listener thread could not be created.
    #[error("リスナースレッドを起動できません: {0}")]
    SpawnFailed(String),

    /// The listener thread exited before reporting its registration result.
    #[error("リスナースレッドが登録結果を返さずに終了しました")]
    ListenerDied,

    /// The stop signal could not be delivered to a running listener.
    #[error("リスナーに停止シグナルを送れませんでした: {0}")]
    StopSignalFailed(String),

    /// The listener did not confirm termination in time.
    #[error("リスナーが{0:?}以内に終了しませんでした")]
    TerminationTimeout(Duration),

    /// A previous termination failure disabled the subsystem.
    #[error("停止できないリスナーが残っているため、ホットキー機能は無効化されています")]
    SubsystemFailed,
}

impl HotkeyError {
    /// Returns true if the error leaves the listener subsystem unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StopSignalFailed(_) | Self::TerminationTimeout(_) | Self::SubsystemFailed
        )
    }

    /// Returns true if the error came from installing a new listener.
    #[must_use]
    pub fn is_registration_failure(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedKey(_)
                | Self::UnsupportedModifiers(_)
                | Self::RegistrationRejected { .. }
                | Self::BackendUnavailable(_)
                | Self::SpawnFailed(_)
                | Self::ListenerDied
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Modifiers;

    #[test]
    fn test_error_display_rejected() {
        let err = HotkeyError::RegistrationRejected {
            binding: HotkeyBinding::letter(Modifiers::CONTROL | Modifiers::ALT, 'R'),
            reason: "already registered".to_string(),
        };
        assert!(err.to_string().contains("CTRL + ALT + R"));
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_error_display_unsupported_key() {
        let err = HotkeyError::UnsupportedKey(0x20);
        assert!(err.to_string().contains("0x20"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(HotkeyError::StopSignalFailed("x".into()).is_fatal());
        assert!(HotkeyError::TerminationTimeout(Duration::from_secs(2)).is_fatal());
        assert!(HotkeyError::SubsystemFailed.is_fatal());
        assert!(!HotkeyError::ListenerDied.is_fatal());
        assert!(!HotkeyError::UnsupportedKey(0).is_fatal());
    }

    #[test]
    fn test_is_registration_failure() {
        assert!(HotkeyError::UnsupportedModifiers(0x10).is_registration_failure());
        assert!(HotkeyError::BackendUnavailable("no display".into()).is_registration_failure());
        assert!(!HotkeyError::SubsystemFailed.is_registration_failure());
    }
}
