//! User-facing controls for a running watcher.
//!
//! The watcher has no window of its own. Commands come from lines typed on
//! stdin and, on unix, from signals (`SIGHUP` reloads, `SIGINT`/`SIGTERM` exit).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::types::{CycleSummary, RepoOutcome};
use crate::io::opener::open_for_editing;
use crate::watch::{WatchCommand, WatchEvent, WatchHandle};

pub const HELP: &str = "\
commands:
  c, check     run a check now
  p, toggle    pause or resume
  pause        pause timed checks
  resume       resume timed checks
  r, reload    reload the config file
  o, open      open the config file for editing
  s, status    show watcher status
  q, quit      stop the watcher
  ?, help      show this help";

/// A recognized console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    Send(WatchCommand),
    OpenConfig,
    Help,
    Quit,
}

/// Map one console line to an action. `None` for unrecognized input.
pub fn parse_console_line(line: &str) -> Option<ConsoleAction> {
    let action = match line.trim().to_ascii_lowercase().as_str() {
        "c" | "check" => ConsoleAction::Send(WatchCommand::CheckNow),
        "p" | "toggle" => ConsoleAction::Send(WatchCommand::TogglePause),
        "pause" => ConsoleAction::Send(WatchCommand::Pause),
        "resume" | "unpause" => ConsoleAction::Send(WatchCommand::Resume),
        "r" | "reload" => ConsoleAction::Send(WatchCommand::Reload),
        "s" | "status" => ConsoleAction::Send(WatchCommand::ReportStatus),
        "o" | "open" => ConsoleAction::OpenConfig,
        "?" | "h" | "help" => ConsoleAction::Help,
        "q" | "quit" | "exit" => ConsoleAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Read commands from `input` until quit, EOF, or the worker stops.
///
/// EOF does not stop the watcher; it keeps running until a signal or another
/// handle shuts it down.
pub fn run_console<I: BufRead, O: Write>(
    handle: &WatchHandle,
    config_path: &Path,
    input: I,
    mut output: O,
) -> Result<()> {
    for line in input.lines() {
        let line = line.context("read console input")?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_console_line(&line) {
            Some(ConsoleAction::Send(command)) => {
                if !handle.send(command) {
                    debug!("watcher already stopped");
                    return Ok(());
                }
            }
            Some(ConsoleAction::OpenConfig) => {
                if let Err(err) = open_for_editing(config_path) {
                    warn!(error = %format!("{err:#}"), "could not open config");
                    writeln!(output, "could not open {}: {err:#}", config_path.display())?;
                }
            }
            Some(ConsoleAction::Help) => writeln!(output, "{HELP}")?,
            Some(ConsoleAction::Quit) => {
                handle.shutdown();
                return Ok(());
            }
            None => writeln!(output, "unknown command '{}'\n{HELP}", line.trim())?,
        }
    }
    debug!("console input closed");
    Ok(())
}

/// Run [`run_console`] on stdin in a background thread.
pub fn spawn_console(handle: WatchHandle, config_path: PathBuf) -> Result<()> {
    thread::Builder::new()
        .name("retouch-console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            if let Err(err) = run_console(&handle, &config_path, stdin.lock(), std::io::stdout()) {
                warn!(error = %format!("{err:#}"), "console stopped");
            }
        })
        .context("spawn console thread")?;
    Ok(())
}

/// Translate `SIGHUP` into a reload and `SIGINT`/`SIGTERM` into shutdown.
#[cfg(unix)]
pub fn spawn_signal_listener(handle: WatchHandle) -> Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGHUP, SIGINT, SIGTERM]).context("register signal handlers")?;
    thread::Builder::new()
        .name("retouch-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if signal == SIGHUP {
                    debug!("SIGHUP received, reloading");
                    handle.send(WatchCommand::Reload);
                } else {
                    debug!(signal, "termination signal received");
                    handle.shutdown();
                    break;
                }
            }
        })
        .context("spawn signal thread")?;
    Ok(())
}

/// Tray-style status text.
pub fn status_text(paused: bool) -> &'static str {
    if paused { "retouch (paused)" } else { "retouch" }
}

/// One-line rendering of a worker event for the console.
pub fn describe_event(event: &WatchEvent) -> String {
    match event {
        WatchEvent::Started {
            repo_count,
            interval,
            paused,
        } => format!(
            "{}: watching {repo_count} repositories every {}",
            status_text(*paused),
            format_interval(*interval)
        ),
        WatchEvent::Paused => status_text(true).to_string(),
        WatchEvent::Resumed => status_text(false).to_string(),
        WatchEvent::Reloaded {
            repo_count,
            interval,
        } => format!(
            "config reloaded: {repo_count} repositories every {}",
            format_interval(*interval)
        ),
        WatchEvent::ReloadFailed { error } => format!("reload failed: {error}"),
        WatchEvent::Status {
            repo_count,
            interval,
            paused,
        } => format!(
            "{}: {repo_count} repositories every {}",
            status_text(*paused),
            format_interval(*interval)
        ),
        WatchEvent::CycleFinished(summary) => describe_cycle(summary),
        WatchEvent::Stopped => "stopped".to_string(),
    }
}

/// Human-readable cycle summary, one line per repository that had findings.
pub fn describe_cycle(summary: &CycleSummary) -> String {
    let mut out = format!(
        "{:?} check: {} repositories, {} restored, {} failed",
        summary.trigger,
        summary.repos.len(),
        summary.repaired_count(),
        summary.failed_count()
    )
    .to_lowercase();
    if summary.interrupted {
        out.push_str(" (interrupted)");
    }
    for check in &summary.repos {
        let detail = match &check.outcome {
            RepoOutcome::Clean => continue,
            RepoOutcome::Unavailable { error } => format!("unavailable: {error}"),
            RepoOutcome::Oversized => format!("skipped, {} changes reported", check.reported),
            RepoOutcome::Repaired { repaired, failed } => {
                let mut parts = Vec::new();
                if !repaired.is_empty() {
                    parts.push(format!("restored {}", repaired.join(", ")));
                }
                if !failed.is_empty() {
                    parts.push(format!("failed {}", failed.join(", ")));
                }
                parts.join("; ")
            }
        };
        out.push_str(&format!("\n  {}: {detail}", check.repo.name));
    }
    out
}

fn format_interval(interval: Duration) -> String {
    format!("{}s", interval.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RepoCheck, Trigger, WatchedRepo};

    #[test]
    fn parses_commands_case_insensitively() {
        assert_eq!(
            parse_console_line(" Check "),
            Some(ConsoleAction::Send(WatchCommand::CheckNow))
        );
        assert_eq!(
            parse_console_line("unpause"),
            Some(ConsoleAction::Send(WatchCommand::Resume))
        );
        assert_eq!(
            parse_console_line("p"),
            Some(ConsoleAction::Send(WatchCommand::TogglePause))
        );
        assert_eq!(parse_console_line("o"), Some(ConsoleAction::OpenConfig));
        assert_eq!(parse_console_line("EXIT"), Some(ConsoleAction::Quit));
        assert_eq!(parse_console_line("frobnicate"), None);
    }

    #[test]
    fn status_text_reflects_pause() {
        assert_eq!(status_text(false), "retouch");
        assert_eq!(status_text(true), "retouch (paused)");
    }

    #[test]
    fn describes_cycle_findings_only() {
        let summary = CycleSummary {
            trigger: Trigger::Manual,
            repos: vec![
                RepoCheck {
                    repo: WatchedRepo::new("quiet", "/r/quiet"),
                    reported: 1,
                    outcome: RepoOutcome::Clean,
                },
                RepoCheck {
                    repo: WatchedRepo::new("island", "/r/island"),
                    reported: 2,
                    outcome: RepoOutcome::Repaired {
                        repaired: vec!["a.txt".to_string()],
                        failed: vec!["b.txt".to_string()],
                    },
                },
                RepoCheck {
                    repo: WatchedRepo::new("busy", "/r/busy"),
                    reported: 30,
                    outcome: RepoOutcome::Oversized,
                },
            ],
            interrupted: false,
        };

        assert_eq!(
            describe_cycle(&summary),
            "manual check: 3 repositories, 1 restored, 1 failed\n  island: restored a.txt; failed b.txt\n  busy: skipped, 30 changes reported"
        );
    }
}
