//! Running child processes and capturing their combined output.
//!
//! The watcher only ever needs "run this in that directory and give me the
//! text back", so [`CommandRunner`] is the seam tests replace.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// A program and its arguments. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured child process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Stdout followed by stderr, decoded lossily.
    pub text: String,
    /// Bytes discarded beyond the output limit.
    pub truncated_bytes: usize,
}

impl CommandOutput {
    /// Successful output carrying `text`. Handy for fakes.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            text: text.into(),
            truncated_bytes: 0,
        }
    }

    /// Failed output with the given exit code and text.
    pub fn failed(exit_code: i32, text: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            success: false,
            text: text.into(),
            truncated_bytes: 0,
        }
    }
}

/// Executes an invocation in a working directory and blocks until it exits.
///
/// `Err` means the command could not be launched (or waited on); a command
/// that ran and failed is reported through [`CommandOutput::success`].
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation, workdir: &Path) -> Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, invocation: &Invocation, workdir: &Path) -> Result<CommandOutput> {
        (**self).run(invocation, workdir)
    }
}

/// Runner backed by `std::process`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// `None` waits indefinitely.
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(None, DEFAULT_OUTPUT_LIMIT_BYTES)
    }
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(command = %invocation, workdir = %workdir.display()))]
    fn run(&self, invocation: &Invocation, workdir: &Path) -> Result<CommandOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).current_dir(workdir);
        run_command(cmd, self.timeout, self.output_limit_bytes)
    }
}

/// Run a command and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes`
/// bounds the amount of each stream kept in memory; the rest is drained and
/// discarded. On timeout the child is killed and an error is returned.
pub fn run_command(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let (status, timed_out) = wait_child(&mut child, timeout)?;

    // Only the direct child is killed. Anything it spawned may still hold the
    // pipes open, so the readers are detached rather than joined; they exit
    // once the last writer goes away.
    if timed_out {
        drop((stdout_handle, stderr_handle));
        let limit = timeout.unwrap_or_default();
        return Err(anyhow!("command timed out after {}s", limit.as_secs_f32()));
    }

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    let truncated_bytes = stdout_truncated + stderr_truncated;
    if truncated_bytes > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    let mut text = String::from_utf8_lossy(&stdout).into_owned();
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(&stderr));
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(CommandOutput {
        exit_code: status.code(),
        success: status.success(),
        text,
        truncated_bytes,
    })
}

fn wait_child(
    child: &mut std::process::Child,
    timeout: Option<Duration>,
) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("wait for command")?;
        return Ok((status, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((status, false)),
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().context("kill command")?;
            let status = child.wait().context("wait command after kill")?;
            Ok((status, true))
        }
    }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
