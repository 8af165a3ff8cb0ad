//! Error types for configuration persistence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration load/save error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The user configuration directory could not be determined.
    #[error("Failed to determine the user config directory")]
    ConfigDirNotFound,

    /// Failed to create the directory holding the config file.
    #[error("Failed to create config directory: {0}")]
    DirectoryCreation(#[source] io::Error),

    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid JSON for the record.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize the record.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Failed to write the config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
