//! Error types for autostart management.

use std::io;

use thiserror::Error;

/// Autostart management error type.
#[derive(Debug, Error)]
pub enum AutostartError {
    /// Failed to resolve the path of the running executable.
    #[error("Failed to resolve the executable path: {0}")]
    ExecutablePath(#[source] io::Error),

    /// The platform directory holding autostart entries is unknown.
    #[error("Failed to determine the autostart directory")]
    DirectoryNotFound,

    /// Failed to create the autostart directory.
    #[error("Failed to create directory: {0}")]
    DirectoryCreation(#[source] io::Error),

    /// Failed to write the autostart entry.
    #[error("Failed to write autostart entry: {0}")]
    EntryWrite(#[source] io::Error),

    /// Failed to remove the autostart entry.
    #[error("Failed to remove autostart entry: {0}")]
    EntryRemove(#[source] io::Error),

    /// Failed to check whether the autostart entry exists.
    #[error("Failed to inspect autostart entry: {0}")]
    EntryStat(#[source] io::Error),

    /// Failed to serialize the LaunchAgent plist.
    #[error("Failed to serialize plist: {0}")]
    PlistSerialize(#[source] plist::Error),

    /// Failed to convert the plist to a UTF-8 string.
    #[error("Failed to convert plist to UTF-8: {0}")]
    PlistUtf8(#[source] std::string::FromUtf8Error),
}

/// Result type for autostart operations.
pub type Result<T> = std::result::Result<T, AutostartError>;
