//! Git adapter for the watcher.
//!
//! Only two git operations are needed: listing changed files and discarding
//! local modifications to one file. Both go through a [`CommandRunner`] so the
//! check logic can be exercised without a real repository.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::process::{CommandOutput, CommandRunner, Invocation};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git<R> {
    workdir: PathBuf,
    runner: R,
}

impl<R: CommandRunner> Git<R> {
    pub fn new(workdir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            workdir: workdir.into(),
            runner,
        }
    }

    /// Raw combined output of `git diff --name-only`.
    ///
    /// Git prints its normalization warnings on stderr next to the file names,
    /// so both streams are returned. A non-zero exit is logged but its text is
    /// still returned; only a launch failure is an error.
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn changed_files_report(&self) -> Result<String> {
        let output = self.run(&["diff", "--name-only"])?;
        if !output.success {
            warn!(
                exit_code = ?output.exit_code,
                output = %output.text.trim(),
                "git diff exited unsuccessfully"
            );
        }
        Ok(output.text)
    }

    /// Discard local modifications to `path` (`git checkout -- <path>`).
    #[instrument(skip_all, fields(workdir = %self.workdir.display(), path))]
    pub fn discard_changes(&self, path: &str) -> Result<()> {
        debug!(path, "discarding local modifications");
        self.run_checked(&["checkout", "--", path])?;
        Ok(())
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if !output.success {
            return Err(anyhow!(
                "git {} failed with status {:?}: {}",
                args.join(" "),
                output.exit_code,
                output.text.trim()
            ));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let invocation = Invocation::new("git", args.iter().copied());
        self.runner
            .run(&invocation, &self.workdir)
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}
