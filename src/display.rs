use crate::error::{Error, Result};
use log::info;
use std::path::Path;
use std::process::Command;

/// Command that opens `path` in the platform's default viewer.
pub fn viewer_command(path: &Path) -> Command {
    let mut cmd;
    if cfg!(target_os = "windows") {
        cmd = Command::new("cmd");
        // empty title so a quoted path is not taken as the window title
        cmd.args(["/C", "start", ""]);
    } else if cfg!(target_os = "macos") {
        cmd = Command::new("open");
    } else {
        cmd = Command::new("xdg-open");
    }
    cmd.arg(path);
    cmd
}

/// Show the saved figure. The viewer runs detached; only a failure to
/// launch it is an error.
pub fn show(path: &Path) -> Result<()> {
    let mut cmd = viewer_command(path);
    info!("Opening {:?}...", path);
    cmd.spawn().map_err(|e| {
        Error::Display(format!(
            "failed to launch {:?} for {:?}: {}",
            cmd.get_program(),
            path,
            e
        ))
    })?;
    Ok(())
}
