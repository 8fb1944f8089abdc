//! Test-only helpers: a scripted command runner and throwaway git repositories.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};

use crate::io::process::{CommandOutput, CommandRunner, Invocation, ProcessRunner};

/// A command observed by [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub workdir: PathBuf,
    pub invocation: Invocation,
}

#[derive(Debug, Default)]
struct ScriptState {
    reports: HashMap<PathBuf, String>,
    unavailable: HashSet<PathBuf>,
    failing_discards: HashSet<String>,
    calls: Vec<RecordedCall>,
}

/// Fake git that answers `diff` with a scripted report per working directory.
///
/// A successful `checkout -- <path>` removes lines quoting `'<path>'` from that
/// directory's report, mimicking git no longer warning about a restored file.
/// Clones share state, so a clone handed to a worker can be inspected later.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(self, workdir: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.set_report(workdir, text);
        self
    }

    /// Spawning anything in `workdir` fails.
    pub fn with_unavailable(self, workdir: impl Into<PathBuf>) -> Self {
        self.lock().unavailable.insert(workdir.into());
        self
    }

    /// `checkout -- <path>` exits non-zero.
    pub fn with_failing_discard(self, path: impl Into<String>) -> Self {
        self.lock().failing_discards.insert(path.into());
        self
    }

    pub fn set_report(&self, workdir: impl Into<PathBuf>, text: impl Into<String>) {
        self.lock().reports.insert(workdir.into(), text.into());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of `git diff` invocations in `workdir`.
    pub fn diff_count(&self, workdir: &Path) -> usize {
        self.calls_with(workdir, "diff").count()
    }

    /// Paths passed to `git checkout --` in `workdir`, including failed attempts.
    pub fn discarded(&self, workdir: &Path) -> Vec<String> {
        self.calls_with(workdir, "checkout")
            .filter_map(|call| call.invocation.args.last().cloned())
            .collect()
    }

    fn calls_with(&self, workdir: &Path, subcommand: &str) -> impl Iterator<Item = RecordedCall> {
        let workdir = workdir.to_path_buf();
        let subcommand = subcommand.to_string();
        self.calls().into_iter().filter(move |call| {
            call.workdir == workdir
                && call.invocation.args.first().map(String::as_str) == Some(subcommand.as_str())
        })
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().expect("scripted runner state poisoned")
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, workdir: &Path) -> Result<CommandOutput> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            workdir: workdir.to_path_buf(),
            invocation: invocation.clone(),
        });
        if state.unavailable.contains(workdir) {
            bail!("scripted launch failure in {}", workdir.display());
        }
        match invocation.args.first().map(String::as_str) {
            Some("diff") => Ok(CommandOutput::ok(
                state.reports.get(workdir).cloned().unwrap_or_default(),
            )),
            Some("checkout") => {
                let path = invocation
                    .args
                    .last()
                    .cloned()
                    .ok_or_else(|| anyhow!("checkout without path"))?;
                if state.failing_discards.contains(&path) {
                    return Ok(CommandOutput::failed(
                        1,
                        format!("error: unable to restore '{path}'"),
                    ));
                }
                if let Some(report) = state.reports.get_mut(workdir) {
                    let quoted = format!("'{path}'");
                    *report = report
                        .lines()
                        .filter(|line| !line.contains(&quoted))
                        .map(|line| format!("{line}\n"))
                        .collect();
                }
                Ok(CommandOutput::ok(""))
            }
            _ => bail!("unexpected command {invocation}"),
        }
    }
}

/// A real git repository in a temporary directory with one initial commit.
pub struct TestRepo {
    dir: tempfile::TempDir,
    runner: ProcessRunner,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo dir")?;
        let repo = Self {
            dir,
            runner: ProcessRunner::default(),
        };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "retouch@example.com"])?;
        repo.git(&["config", "user.name", "retouch tests"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        repo.git(&["config", "core.autocrlf", "false"])?;
        repo.write(".gitkeep", "")?;
        repo.commit_all("initial")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.path().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-q", "-m", message])?;
        Ok(())
    }

    /// Run git in the repository, failing on non-zero exit.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        let output = self
            .runner
            .run(&Invocation::new("git", args.iter().copied()), self.path())?;
        if !output.success {
            bail!("git {} failed: {}", args.join(" "), output.text.trim());
        }
        Ok(output.text)
    }
}
