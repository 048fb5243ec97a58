//! Run artifacts written after a pipeline finishes.
//!
//! These are product output, unaffected by `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::driver::{PipelineRun, RunStop};
use crate::report::RunReport;

#[derive(Debug, Clone)]
pub struct RunArtifactPaths {
    pub dir: PathBuf,
    pub state_path: PathBuf,
    pub outcome_path: PathBuf,
    pub report_json_path: PathBuf,
    pub report_md_path: PathBuf,
}

impl RunArtifactPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            state_path: dir.join("state.json"),
            outcome_path: dir.join("outcome.json"),
            report_json_path: dir.join("report.json"),
            report_md_path: dir.join("report.md"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct RunOutcome {
    stop: &'static str,
    steps: u32,
    max_steps: Option<u32>,
    succeeded: bool,
}

impl RunOutcome {
    fn from_run(run: &PipelineRun) -> Self {
        let (stop, max_steps) = match run.stop {
            RunStop::Completed => ("completed", None),
            RunStop::Aborted => ("aborted", None),
            RunStop::StepLimitExceeded { max_steps, .. } => {
                ("step_limit_exceeded", Some(max_steps))
            }
        };
        Self {
            stop,
            steps: run.steps,
            max_steps,
            succeeded: run.succeeded(),
        }
    }
}

/// Write the final state, run outcome, and review artifact into `dir`.
pub fn write_run_artifacts(dir: &Path, run: &PipelineRun) -> Result<RunArtifactPaths> {
    let paths = RunArtifactPaths::new(dir);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create run dir {}", paths.dir.display()))?;

    let report = RunReport::from_state(&run.state);
    let markdown = report.render_markdown()?;

    // Deterministic order keeps partially written directories predictable.
    write_json(&paths.state_path, &run.state)?;
    write_json(&paths.outcome_path, &RunOutcome::from_run(run))?;
    write_json(&paths.report_json_path, &report)?;
    write_text(&paths.report_md_path, &markdown)?;

    Ok(paths)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    buf.push('\n');
    write_text(path, &buf)
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::PipelineState;
    use crate::driver::Pipeline;
    use crate::io::config::EngineConfig;
    use crate::report::RiskLevel;
    use crate::test_support::{ScriptedCollaborators, TestWorkspace, task};

    #[test]
    fn writes_all_artifacts() {
        let scripted = ScriptedCollaborators::with_tasks(vec![task("a", &[])]);
        let run = Pipeline::new(scripted.collaborators(), &EngineConfig::default())
            .run("rename hooks", "/repo");
        let workspace = TestWorkspace::new().expect("workspace");

        let paths = write_run_artifacts(&workspace.path().join("runs/1"), &run).expect("write");

        let state: PipelineState =
            serde_json::from_str(&fs::read_to_string(&paths.state_path).expect("read state"))
                .expect("parse state");
        assert_eq!(state, run.state);

        let outcome: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.outcome_path).expect("read outcome"))
                .expect("parse outcome");
        assert_eq!(outcome["stop"], "completed");
        assert_eq!(outcome["succeeded"], true);

        let report: RunReport = serde_json::from_str(
            &fs::read_to_string(&paths.report_json_path).expect("read report"),
        )
        .expect("parse report");
        assert_eq!(report.risk, RiskLevel::Low);

        let markdown = fs::read_to_string(&paths.report_md_path).expect("read markdown");
        assert!(markdown.contains("# Refactor: rename hooks"));
    }

    #[test]
    fn outcome_records_step_ceiling() {
        let run = PipelineRun {
            state: PipelineState::new("d", "/repo", 3),
            stop: RunStop::StepLimitExceeded {
                steps: 5,
                max_steps: 5,
            },
            steps: 5,
        };
        let outcome = RunOutcome::from_run(&run);
        assert_eq!(outcome.stop, "step_limit_exceeded");
        assert_eq!(outcome.max_steps, Some(5));
        assert!(!outcome.succeeded);
    }
}
