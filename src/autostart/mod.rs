//! Start-at-login management.
//!
//! Each host gets one kind of entry:
//! - Linux and other Unix desktops: `~/.config/autostart/hydra-reminder.desktop`
//! - macOS: `~/Library/LaunchAgents/com.hydra-reminder.agent.plist`
//! - Windows: a launcher script in the user's `Startup` folder
//!
//! The entry's presence on disk is the enabled state.
//!
//! # Example
//!
//! ```no_run
//! use hydra_reminder::autostart::AutostartEntry;
//!
//! let entry = AutostartEntry::for_current_host()?;
//! entry.enable()?;
//! assert!(entry.is_enabled()?);
//! entry.disable()?;
//! # Ok::<(), hydra_reminder::autostart::AutostartError>(())
//! ```

pub mod desktop;
pub mod error;
pub mod plist;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use error::{AutostartError, Result};
pub use plist::ReminderLaunchAgent;

/// Format of the autostart entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// XDG `.desktop` file
    DesktopEntry,
    /// macOS LaunchAgent plist
    LaunchAgent,
    /// Windows Startup folder `.cmd` script
    StartupScript,
}

impl EntryKind {
    /// Entry kind used on this host.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            EntryKind::LaunchAgent
        } else if cfg!(target_os = "windows") {
            EntryKind::StartupScript
        } else {
            EntryKind::DesktopEntry
        }
    }

    /// Default entry location for this kind.
    ///
    /// # Errors
    /// Returns [`AutostartError::DirectoryNotFound`] if the platform
    /// directory cannot be determined.
    pub fn default_path(&self) -> Result<PathBuf> {
        match self {
            EntryKind::DesktopEntry => {
                let config = dirs::config_dir().ok_or(AutostartError::DirectoryNotFound)?;
                Ok(config.join("autostart").join("hydra-reminder.desktop"))
            }
            EntryKind::LaunchAgent => {
                let home = dirs::home_dir().ok_or(AutostartError::DirectoryNotFound)?;
                Ok(home
                    .join("Library/LaunchAgents")
                    .join(format!("{}.plist", ReminderLaunchAgent::LABEL)))
            }
            EntryKind::StartupScript => {
                let roaming = dirs::data_dir().ok_or(AutostartError::DirectoryNotFound)?;
                Ok(roaming
                    .join("Microsoft")
                    .join("Windows")
                    .join("Start Menu")
                    .join("Programs")
                    .join("Startup")
                    .join("HydraReminder.cmd"))
            }
        }
    }
}

/// The start-at-login entry of one executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutostartEntry {
    kind: EntryKind,
    path: PathBuf,
    executable: PathBuf,
}

impl AutostartEntry {
    /// Creates an entry of `kind` at `path` launching `executable`.
    pub fn new(kind: EntryKind, path: impl Into<PathBuf>, executable: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            executable: executable.into(),
        }
    }

    /// The entry for the running executable at this host's default location.
    ///
    /// # Errors
    /// Returns an error if the executable path or the platform directory
    /// cannot be resolved.
    pub fn for_current_host() -> Result<Self> {
        let executable = std::env::current_exe().map_err(AutostartError::ExecutablePath)?;
        let kind = EntryKind::current();
        Ok(Self::new(kind, kind.default_path()?, executable))
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders the entry file contents.
    ///
    /// # Errors
    /// Returns an error if the LaunchAgent plist cannot be serialized.
    pub fn render(&self) -> Result<String> {
        match self.kind {
            EntryKind::DesktopEntry => Ok(desktop::desktop_entry(&self.executable)),
            EntryKind::LaunchAgent => {
                ReminderLaunchAgent::new(self.executable.to_string_lossy()).to_xml()
            }
            EntryKind::StartupScript => Ok(desktop::startup_script(&self.executable)),
        }
    }

    /// Writes the entry, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn enable(&self) -> Result<()> {
        let contents = self.render()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(AutostartError::DirectoryCreation)?;
        }
        fs::write(&self.path, contents).map_err(AutostartError::EntryWrite)?;

        tracing::info!(path = %self.path.display(), "自動起動を有効にしました");
        Ok(())
    }

    /// Removes the entry. Succeeds if it does not exist.
    ///
    /// # Errors
    /// Returns an error if an existing entry cannot be removed.
    pub fn disable(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "自動起動を無効にしました");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AutostartError::EntryRemove(err)),
        }
    }

    /// Returns true if the entry exists.
    ///
    /// # Errors
    /// Returns an error if the entry's existence cannot be determined.
    pub fn is_enabled(&self) -> Result<bool> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(AutostartError::EntryStat(err)),
        }
    }

    /// Enables or disables the entry.
    ///
    /// # Errors
    /// Returns the error of [`enable`](Self::enable) or
    /// [`disable`](Self::disable).
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.enable()
        } else {
            self.disable()
        }
    }
}
