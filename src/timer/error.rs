//! Timer error types.

use thiserror::Error;

/// Errors returned by the reminder state machine.
///
/// The state machine only rejects programmer-error inputs; every other
/// condition (stale fires, redundant stops) is resolved internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// `start` was called with a zero-length countdown.
    #[error("タイマーの時間は0より大きくなければなりません")]
    InvalidDuration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_duration() {
        let err = TimerError::InvalidDuration;
        assert!(err.to_string().contains("0より大きく"));
    }
}
