//! Checking repositories for false positives and repairing them.
//!
//! This joins the pure planning in [`crate::core`] with the git adapter: list
//! changes, plan repairs, then discard each planned path one at a time.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument, warn};

use crate::core::classifier::LineClassifier;
use crate::core::reconcile::{RepairPlan, plan_repairs};
use crate::core::report::ChangeReport;
use crate::core::types::{CycleSummary, RepoCheck, RepoOutcome, Trigger, WatchedRepo};
use crate::io::git::Git;
use crate::io::probe::FileProbe;
use crate::io::process::CommandRunner;

/// Runs the check-and-repair pass for repositories.
#[derive(Debug, Clone)]
pub struct RepoChecker<R, P, C> {
    runner: R,
    probe: P,
    classifier: C,
}

impl<R, P, C> RepoChecker<R, P, C>
where
    R: CommandRunner,
    P: FileProbe,
    C: LineClassifier,
{
    pub fn new(runner: R, probe: P, classifier: C) -> Self {
        Self {
            runner,
            probe,
            classifier,
        }
    }

    /// Check every repository in order.
    ///
    /// `running` is read before each repository; once it is false the rest of
    /// the cycle is skipped and the summary is marked interrupted.
    #[instrument(skip_all, fields(trigger = ?trigger, repo_count = repos.len()))]
    pub fn run_cycle(
        &self,
        repos: &[WatchedRepo],
        trigger: Trigger,
        running: &AtomicBool,
    ) -> CycleSummary {
        let mut checks = Vec::with_capacity(repos.len());
        let mut interrupted = false;
        for repo in repos {
            if !running.load(Ordering::SeqCst) {
                info!(
                    remaining = repos.len() - checks.len(),
                    "shutdown requested, stopping cycle"
                );
                interrupted = true;
                break;
            }
            checks.push(self.check_repo(repo));
        }
        CycleSummary {
            trigger,
            repos: checks,
            interrupted,
        }
    }

    /// List changes in `repo`, then discard every confirmed false positive.
    #[instrument(skip_all, fields(repo = %repo.name, path = %repo.path.display()))]
    pub fn check_repo(&self, repo: &WatchedRepo) -> RepoCheck {
        let git = Git::new(&repo.path, &self.runner);
        let raw = match git.changed_files_report() {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "could not list changes, treating as clean");
                return RepoCheck {
                    repo: repo.clone(),
                    reported: 0,
                    outcome: RepoOutcome::Unavailable {
                        error: format!("{err:#}"),
                    },
                };
            }
        };

        let report = ChangeReport::parse(&raw);
        let plan = plan_repairs(&report, &self.classifier, |candidate| {
            self.probe.is_regular_file(&repo.path.join(candidate))
        });
        debug!(reported = report.len(), ?plan, "planned repairs");

        let outcome = match plan {
            RepairPlan::Oversized { line_count } => {
                info!(line_count, "too many reported changes, leaving repository alone");
                RepoOutcome::Oversized
            }
            RepairPlan::Repair(paths) if paths.is_empty() => RepoOutcome::Clean,
            RepairPlan::Repair(paths) => {
                let mut repaired = Vec::new();
                let mut failed = Vec::new();
                for path in paths {
                    match git.discard_changes(&path) {
                        Ok(()) => {
                            info!(path = %path, "discarded false-positive modification");
                            repaired.push(path);
                        }
                        Err(err) => {
                            warn!(
                                path = %path,
                                error = %format!("{err:#}"),
                                "failed to discard modification"
                            );
                            failed.push(path);
                        }
                    }
                }
                RepoOutcome::Repaired { repaired, failed }
            }
        };

        RepoCheck {
            repo: repo.clone(),
            reported: report.len(),
            outcome,
        }
    }
}
