//! Command serializer error types.

use thiserror::Error;

/// Errors returned when enqueueing indicator commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializerError {
    /// The queue is at capacity (non-blocking enqueue only).
    #[error("インジケーターキューが満杯です")]
    Full,

    /// The consumer has stopped.
    #[error("インジケーターキューは停止しています")]
    Disconnected,

    /// The consumer thread could not be created.
    #[error("インジケーターのスレッドを起動できません: {0}")]
    SpawnFailed(String),
}

impl SerializerError {
    /// Returns true if retrying later may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full)
    }
}
