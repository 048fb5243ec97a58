//! Review artifact summarizing a finished run.
//!
//! Built purely from the final [`PipelineState`]; rendering goes through a
//! bundled minijinja template.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use crate::core::feedback::has_abort_entry;
use crate::core::state::PipelineState;
use crate::core::types::TaskStatus;

const REPORT_TEMPLATE: &str = include_str!("templates/report.md");

const TITLE_DIRECTIVE_CHARS: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub title: String,
    pub summary: String,
    pub risk: RiskLevel,
    pub changed_files: Vec<String>,
    pub reviewer_checklist: Vec<String>,
    pub rollback_instructions: Vec<String>,
    pub task_count: usize,
    pub completed_task_count: usize,
    pub skipped_task_count: usize,
    pub failed_task_count: usize,
    pub audit_passed: bool,
    pub tests_passed: bool,
    pub low_trust_pass: bool,
    pub aborted: bool,
    pub error_count: usize,
}

impl RunReport {
    pub fn from_state(state: &PipelineState) -> Self {
        let changed_files: Vec<String> = state
            .diffs
            .iter()
            .map(|diff| diff.file_path.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let count = |status: TaskStatus| {
            state
                .task_tree
                .iter()
                .filter(|task| task.status == status)
                .count()
        };
        let completed = count(TaskStatus::Completed);
        let skipped = count(TaskStatus::Skipped);
        let failed = count(TaskStatus::Failed);

        let audit_passed = state.audit_results.as_ref().is_some_and(|a| a.passed);
        let tests_passed = state.test_results.as_ref().is_some_and(|t| t.passed);
        let low_trust_pass = state
            .test_results
            .as_ref()
            .is_some_and(|t| t.low_trust_pass);
        let aborted = has_abort_entry(&state.errors);

        let risk = if aborted || !audit_passed || !tests_passed {
            RiskLevel::High
        } else if low_trust_pass || failed > 0 || skipped > 0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let directive: String = state.directive.chars().take(TITLE_DIRECTIVE_CHARS).collect();
        let summary = format!(
            "directive='{}', tasks={} completed={completed}, skipped={skipped}, failed={failed}, \
             changed_files={}, audit_passed={audit_passed}, tests_passed={tests_passed}, \
             low_trust={low_trust_pass}",
            state.directive,
            state.task_tree.len(),
            changed_files.len(),
        );

        let mut checklist = vec![
            "Review all generated diffs for correctness and intent.".to_string(),
            "Confirm changed files are scoped to the requested directive.".to_string(),
            "Validate task statuses and ensure no critical tasks were unintentionally skipped."
                .to_string(),
        ];
        let conditional = [
            (!audit_passed, "Address all audit findings before merging."),
            (!tests_passed, "Resolve test failures before merging."),
            (
                low_trust_pass,
                "Manually approve because low-trust test path was used.",
            ),
            (
                failed > 0,
                "Investigate failed task execution and re-run this refactor.",
            ),
            (skipped > 0, "Confirm skipped tasks are intentionally deferred."),
            (
                !state.errors.is_empty(),
                "Address all listed run errors before merging.",
            ),
        ];
        checklist.extend(
            conditional
                .iter()
                .filter(|(applies, _)| *applies)
                .map(|(_, item)| item.to_string()),
        );
        checklist.push("Run local smoke checks (lint/targeted tests) before merge.".to_string());

        Self {
            title: format!("Refactor: {directive}"),
            summary,
            risk,
            rollback_instructions: rollback_instructions(&changed_files),
            changed_files,
            reviewer_checklist: checklist,
            task_count: state.task_tree.len(),
            completed_task_count: completed,
            skipped_task_count: skipped,
            failed_task_count: failed,
            audit_passed,
            tests_passed,
            low_trust_pass,
            aborted,
            error_count: state.errors.len(),
        }
    }

    pub fn render_markdown(&self) -> Result<String> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template("report.md", REPORT_TEMPLATE)
            .context("load report template")?;
        let template = env.get_template("report.md")?;
        let rendered = template
            .render(context! { report => self })
            .context("render report")?;
        Ok(rendered)
    }
}

/// Full revert first, then per-file restores for partial rollback.
fn rollback_instructions(changed_files: &[String]) -> Vec<String> {
    if changed_files.is_empty() {
        return vec![
            "No files were changed; no rollback required.".to_string(),
            "Optional: confirm with git status --short before closeout.".to_string(),
        ];
    }

    let mut steps: Vec<String> = [
        "git status --short",
        "git rev-parse --abbrev-ref HEAD",
        "git restore --source=HEAD --worktree --staged .",
        "git restore --source=HEAD --worktree -- .",
        "Full rollback completed; verify:",
        "git status --short",
    ]
    .iter()
    .map(|step| step.to_string())
    .collect();
    steps.extend(
        changed_files
            .iter()
            .map(|path| format!("git restore --source=HEAD --worktree -- {path}")),
    );
    steps.push(
        "If restore conflicts occur, inspect with git status and resolve manually before continuing."
            .to_string(),
    );
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feedback::ABORT_PREFIX;
    use crate::test_support::{
        audit_report, diff, low_trust_report, task_with_status, test_report,
    };

    fn finished_state() -> PipelineState {
        let mut state = PipelineState::new("migrate class components to hooks", "/repo", 3);
        state.task_tree = vec![
            task_with_status("a", &[], TaskStatus::Completed),
            task_with_status("b", &["a"], TaskStatus::Completed),
        ];
        state.diffs = vec![diff("src/b.ts", "b"), diff("src/a.ts", "a"), diff("src/b.ts", "b")];
        state.audit_results = Some(audit_report(true));
        state.test_results = Some(test_report(10, 0));
        state
    }

    #[test]
    fn clean_run_is_low_risk() {
        let report = RunReport::from_state(&finished_state());
        assert_eq!(report.risk, RiskLevel::Low);
        assert_eq!(report.changed_files, vec!["src/a.ts", "src/b.ts"]);
        assert_eq!(report.completed_task_count, 2);
        assert_eq!(report.title, "Refactor: migrate class components to hooks");
        assert_eq!(report.reviewer_checklist.len(), 4);
        assert!(
            report
                .rollback_instructions
                .contains(&"git restore --source=HEAD --worktree -- src/a.ts".to_string())
        );
    }

    #[test]
    fn abort_entry_is_high_risk() {
        let mut state = finished_state();
        state.errors.push(format!("{ABORT_PREFIX} pipeline aborted on task b."));
        let report = RunReport::from_state(&state);
        assert!(report.aborted);
        assert_eq!(report.risk, RiskLevel::High);
        assert!(
            report
                .reviewer_checklist
                .contains(&"Address all listed run errors before merging.".to_string())
        );
    }

    #[test]
    fn low_trust_or_skipped_is_medium_risk() {
        let mut state = finished_state();
        state.test_results = Some(low_trust_report());
        assert_eq!(RunReport::from_state(&state).risk, RiskLevel::Medium);

        let mut state = finished_state();
        state.task_tree[1].status = TaskStatus::Skipped;
        let report = RunReport::from_state(&state);
        assert_eq!(report.risk, RiskLevel::Medium);
        assert_eq!(report.skipped_task_count, 1);
    }

    #[test]
    fn missing_reports_are_high_risk() {
        let state = PipelineState::new("d", "/repo", 3);
        let report = RunReport::from_state(&state);
        assert_eq!(report.risk, RiskLevel::High);
        assert!(report.changed_files.is_empty());
        assert_eq!(
            report.rollback_instructions[0],
            "No files were changed; no rollback required."
        );
    }

    #[test]
    fn title_truncates_long_directive() {
        let mut state = finished_state();
        state.directive = "x".repeat(100);
        let report = RunReport::from_state(&state);
        assert_eq!(report.title.len(), "Refactor: ".len() + 72);
    }

    #[test]
    fn markdown_lists_files_checklist_and_rollback() {
        let markdown = RunReport::from_state(&finished_state())
            .render_markdown()
            .expect("render");
        assert!(markdown.starts_with("---\n"));
        assert!(markdown.contains("risk: \"low\""));
        assert!(markdown.contains("## Changed files\n- src/a.ts\n- src/b.ts\n"));
        assert!(markdown.contains("- [ ] Review all generated diffs for correctness and intent."));
        assert!(markdown.contains("- `git restore --source=HEAD --worktree -- src/b.ts`"));
        assert!(markdown.contains("- Tests passed: yes"));
    }

    #[test]
    fn markdown_marks_empty_change_set() {
        let markdown = RunReport::from_state(&PipelineState::new("d", "/repo", 3))
            .render_markdown()
            .expect("render");
        assert!(markdown.contains("## Changed files\n- (none)\n"));
        assert!(markdown.contains("risk: \"high\""));
    }
}
