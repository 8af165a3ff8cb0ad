//! Login launchers for Linux (XDG desktop entry) and Windows (Startup
//! folder script).

use std::path::Path;

/// Renders an XDG autostart `.desktop` entry for `executable`.
pub fn desktop_entry(executable: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=Hydra Reminder\n\
         Comment=Hydration and Activity Reminder\n\
         Exec={}\n\
         Icon=utilities-terminal\n\
         Terminal=false\n\
         Categories=Utility;\n",
        quote_exec(executable)
    )
}

/// Quotes a path for the `Exec=` key when it contains spaces.
fn quote_exec(executable: &Path) -> String {
    let path = executable.display().to_string();
    if path.contains(' ') {
        format!("\"{}\"", path.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        path
    }
}

/// Renders a Startup folder launcher script for `executable`.
pub fn startup_script(executable: &Path) -> String {
    format!(
        "@echo off\r\nstart \"\" \"{}\" run\r\n",
        executable.display()
    )
}
