//! Opening the config file for editing.

use std::env;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Open `path` with `$VISUAL`/`$EDITOR` if set, otherwise the platform opener.
///
/// An editor from the environment runs in the foreground and this returns
/// once it exits. The platform opener hands the file to a GUI application
/// and is not waited on beyond its own launch.
pub fn open_for_editing(path: &Path) -> Result<()> {
    match editor_from_env() {
        Some(editor) => edit_with(&editor, path),
        None => {
            info!(path = %path.display(), "opening config with platform opener");
            platform_opener(path)
                .status()
                .with_context(|| format!("open {}", path.display()))?;
            Ok(())
        }
    }
}

/// Run `editor` (a program followed by whitespace-separated arguments) on
/// `path` and wait for it to exit.
pub fn edit_with(editor: &str, path: &Path) -> Result<()> {
    let mut words = editor.split_whitespace();
    let Some(program) = words.next() else {
        bail!("editor command is empty");
    };
    info!(editor, path = %path.display(), "opening config");
    let status = Command::new(program)
        .args(words)
        .arg(path)
        .status()
        .with_context(|| format!("launch editor '{editor}' for {}", path.display()))?;
    if !status.success() {
        bail!("editor '{editor}' exited with {status}");
    }
    Ok(())
}

fn editor_from_env() -> Option<String> {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

// `open` and `xdg-open` return once the file has been handed off.
#[cfg(target_os = "macos")]
fn platform_opener(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
}

#[cfg(target_os = "windows")]
fn platform_opener(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(path);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_opener(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}
