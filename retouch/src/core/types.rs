//! Shared deterministic types for watcher results.
//!
//! These types are the stable contract between the check orchestration, the
//! watch loop and the CLI output. They serialize to JSON for `retouch check --json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A configured working directory to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedRepo {
    /// Key from the `[repos]` table.
    pub name: String,
    /// Absolute path of the working tree root.
    pub path: PathBuf,
}

impl WatchedRepo {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// What started a check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Timer,
    Manual,
}

/// Result of checking a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepoOutcome {
    /// No false positives found.
    Clean,
    /// The changed-files listing could not be produced; treated as no changes.
    Unavailable { error: String },
    /// Too many reported lines; the repository was left untouched.
    Oversized,
    /// Corrective actions were issued.
    Repaired {
        /// Paths whose local modifications were discarded.
        repaired: Vec<String>,
        /// Paths whose corrective action failed.
        failed: Vec<String>,
    },
}

/// Outcome of one repository within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCheck {
    pub repo: WatchedRepo,
    /// Number of non-blank lines in the change report.
    pub reported: usize,
    pub outcome: RepoOutcome,
}

impl RepoCheck {
    pub fn repaired(&self) -> &[String] {
        match &self.outcome {
            RepoOutcome::Repaired { repaired, .. } => repaired,
            _ => &[],
        }
    }

    pub fn failed(&self) -> &[String] {
        match &self.outcome {
            RepoOutcome::Repaired { failed, .. } => failed,
            _ => &[],
        }
    }
}

/// Outcome of a full pass over the configured repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub trigger: Trigger,
    pub repos: Vec<RepoCheck>,
    /// True if shutdown was requested before every repository was checked.
    pub interrupted: bool,
}

impl CycleSummary {
    pub fn repaired_count(&self) -> usize {
        self.repos.iter().map(|check| check.repaired().len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.repos.iter().map(|check| check.failed().len()).sum()
    }
}
