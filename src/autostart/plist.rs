//! LaunchAgent plist for macOS login startup.

use serde::{Deserialize, Serialize};

use super::error::{AutostartError, Result};

/// LaunchAgent plist structure.
///
/// Starts the reminder once at login. It is not kept alive: quitting from
/// the menu must stay quit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderLaunchAgent {
    /// Service label (reverse domain format)
    #[serde(rename = "Label")]
    pub label: String,

    /// Program to execute with its arguments
    #[serde(rename = "ProgramArguments")]
    pub program_arguments: Vec<String>,

    /// Whether to start at login
    #[serde(rename = "RunAtLoad")]
    pub run_at_load: bool,

    /// Whether to restart the process when it exits
    #[serde(rename = "KeepAlive")]
    pub keep_alive: bool,

    /// Scheduling class; `Interactive` for UI processes
    #[serde(rename = "ProcessType", skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
}

impl ReminderLaunchAgent {
    /// Service label of the reminder LaunchAgent.
    pub const LABEL: &'static str = "com.hydra-reminder.agent";

    /// Creates a LaunchAgent that runs `binary_path` at login.
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            label: Self::LABEL.to_string(),
            program_arguments: vec![binary_path.into(), "run".to_string()],
            run_at_load: true,
            keep_alive: false,
            process_type: Some("Interactive".to_string()),
        }
    }

    /// Generates the plist XML string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_xml(&self) -> Result<String> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self).map_err(AutostartError::PlistSerialize)?;
        String::from_utf8(buf).map_err(AutostartError::PlistUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_login_item() {
        let agent = ReminderLaunchAgent::new("/Applications/hydra-reminder");

        assert_eq!(agent.label, "com.hydra-reminder.agent");
        assert_eq!(
            agent.program_arguments,
            vec!["/Applications/hydra-reminder", "run"]
        );
        assert!(agent.run_at_load);
        assert!(!agent.keep_alive);
    }

    #[test]
    fn test_to_xml_contains_keys() {
        let xml = ReminderLaunchAgent::new("/usr/local/bin/hydra-reminder")
            .to_xml()
            .unwrap();

        assert!(xml.contains("<key>Label</key>"));
        assert!(xml.contains("<string>com.hydra-reminder.agent</string>"));
        assert!(xml.contains("<key>ProgramArguments</key>"));
        assert!(xml.contains("<key>RunAtLoad</key>"));
        assert!(xml.contains("<key>ProcessType</key>"));
    }

    #[test]
    fn test_xml_parses_back() {
        let agent = ReminderLaunchAgent::new("/usr/local/bin/hydra-reminder");
        let xml = agent.to_xml().unwrap();
        let parsed: ReminderLaunchAgent = plist::from_bytes(xml.as_bytes()).unwrap();
        assert_eq!(parsed, agent);
    }
}
