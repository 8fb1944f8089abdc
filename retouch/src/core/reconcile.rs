//! Turning a change report into the set of paths safe to restore.

use std::path::{Component, Path};

use crate::core::classifier::LineClassifier;
use crate::core::report::ChangeReport;

/// Reports with more lines than this are left alone entirely.
///
/// Large changesets usually mean a branch switch or merge is in progress.
pub const MAX_REPORTED_LINES: usize = 20;

/// What to do for one repository after inspecting its change report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairPlan {
    /// Too many reported lines; take no action.
    Oversized { line_count: usize },
    /// Discard local modifications to each path, in order. May contain duplicates.
    Repair(Vec<String>),
}

impl RepairPlan {
    pub fn paths(&self) -> &[String] {
        match self {
            RepairPlan::Oversized { .. } => &[],
            RepairPlan::Repair(paths) => paths,
        }
    }
}

/// Build the repair set for a change report.
///
/// `is_regular_file` receives each candidate path (relative to the repository
/// root) and must report whether it resolves to an existing regular file.
/// A candidate survives only if it matched the classifier, stays inside the
/// repository, is a regular file, and is not itself a full reported line.
pub fn plan_repairs<C, F>(
    report: &ChangeReport,
    classifier: &C,
    mut is_regular_file: F,
) -> RepairPlan
where
    C: LineClassifier + ?Sized,
    F: FnMut(&str) -> bool,
{
    if report.len() > MAX_REPORTED_LINES {
        return RepairPlan::Oversized {
            line_count: report.len(),
        };
    }

    let repairs = report
        .lines()
        .iter()
        .filter_map(|line| classifier.candidate(line))
        .filter(|candidate| is_contained(candidate))
        .filter(|candidate| is_regular_file(*candidate))
        .filter(|candidate| !report.contains_line(*candidate))
        .map(str::to_string)
        .collect();
    RepairPlan::Repair(repairs)
}

/// Relative path without `..`, roots or prefixes.
fn is_contained(candidate: &str) -> bool {
    Path::new(candidate)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::MarkerClassifier;

    fn warning(path: &str) -> String {
        format!("warning: in the working copy of '{path}', LF will be replaced by CRLF the next time Git touches it")
    }

    fn plan(lines: &[String], files: &[&str]) -> RepairPlan {
        let report = ChangeReport::parse(&lines.join("\n"));
        plan_repairs(&report, &MarkerClassifier::default(), |path| {
            files.contains(&path)
        })
    }

    #[test]
    fn repairs_single_false_positive() {
        let lines = vec![
            "warning: 'src/a.txt' will be affected the next time Git touches it".to_string(),
            "src/b.txt".to_string(),
        ];
        let plan = plan(&lines, &["src/a.txt", "src/b.txt"]);
        assert_eq!(plan, RepairPlan::Repair(vec!["src/a.txt".to_string()]));
    }

    #[test]
    fn oversized_report_plans_nothing() {
        let mut lines: Vec<String> = (0..15).map(|i| format!("file{i}.txt")).collect();
        lines.extend((0..10).map(|i| warning(&format!("w{i}.txt"))));
        let files: Vec<String> = (0..10).map(|i| format!("w{i}.txt")).collect();
        let files: Vec<&str> = files.iter().map(String::as_str).collect();

        let plan = plan(&lines, &files);
        assert_eq!(plan, RepairPlan::Oversized { line_count: 25 });
        assert!(plan.paths().is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut lines: Vec<String> = (0..19).map(|i| format!("file{i}.txt")).collect();
        lines.push(warning("w.txt"));
        let plan = plan(&lines, &["w.txt"]);
        assert_eq!(plan.paths(), ["w.txt"]);
    }

    #[test]
    fn blank_lines_do_not_count_toward_threshold() {
        let mut lines: Vec<String> = (0..20).map(|i| format!("file{i}.txt")).collect();
        lines.extend(std::iter::repeat_n(String::new(), 10));
        let plan = plan(&lines, &[]);
        assert_eq!(plan, RepairPlan::Repair(Vec::new()));
    }

    #[test]
    fn candidate_equal_to_reported_line_is_kept_out() {
        let lines = vec![
            "warning: 'x' ... the next time Git touches it".to_string(),
            "x".to_string(),
        ];
        let plan = plan(&lines, &["x"]);
        assert_eq!(plan, RepairPlan::Repair(Vec::new()));
    }

    #[test]
    fn missing_or_directory_candidates_are_dropped() {
        let lines = vec![warning("gone.txt"), warning("some/dir"), warning("ok.txt")];
        let plan = plan(&lines, &["ok.txt"]);
        assert_eq!(plan.paths(), ["ok.txt"]);
    }

    #[test]
    fn escaping_candidates_never_reach_the_probe() {
        let lines = vec![warning("../outside.txt"), warning("/etc/passwd")];
        let report = ChangeReport::parse(&lines.join("\n"));
        let mut probed = Vec::new();
        let plan = plan_repairs(&report, &MarkerClassifier::default(), |path| {
            probed.push(path.to_string());
            true
        });
        assert_eq!(plan, RepairPlan::Repair(Vec::new()));
        assert!(probed.is_empty());
    }

    #[test]
    fn duplicates_are_preserved_in_order() {
        let lines = vec![warning("b.txt"), warning("a.txt"), warning("b.txt")];
        let plan = plan(&lines, &["a.txt", "b.txt"]);
        assert_eq!(plan.paths(), ["b.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn report_without_markers_plans_nothing() {
        let lines = vec!["src/a.txt".to_string(), "src/b.txt".to_string()];
        let plan = plan(&lines, &["src/a.txt", "src/b.txt"]);
        assert_eq!(plan, RepairPlan::Repair(Vec::new()));
    }

    #[test]
    fn malformed_marker_lines_are_skipped() {
        let lines = vec![
            "warning: 'broken the next time Git touches it".to_string(),
            warning("good.txt"),
        ];
        let plan = plan(&lines, &["good.txt", "broken"]);
        assert_eq!(plan.paths(), ["good.txt"]);
    }
}
