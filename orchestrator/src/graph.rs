//! Fixed stage topology of the pipeline.
//!
//! ```text
//! index -> plan -> execute -> audit -> validate -> (decide)
//!
//! decide: apply | retry | skip | abort
//! apply, skip -> execute if an eligible task remains, else end
//! retry       -> execute
//! abort       -> end
//! ```
//!
//! [`StageGraph::run_stage`] is the dispatch table (`Stage -> StateUpdate`) and
//! [`StageGraph::route`] the routing table (`Stage -> Next`). Stages only read
//! the state snapshot they are given; the driver applies their updates.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};

use crate::collaborators::{CollaboratorKind, Collaborators, invoke};
use crate::core::decision::{Decision, DecisionInputs, DecisionPolicy};
use crate::core::feedback::{abort_summary, retry_feedback};
use crate::core::selector::{Continuation, next_pending_index, next_task_or_end, task_diffs};
use crate::core::state::{PipelineState, StateUpdate};
use crate::core::types::{AuditReport, FileDiff, TaskNode, TaskStatus, TestReport};

/// Key under which planning context is stored in `context_bundles`.
pub const PLANNING_BUNDLE: &str = "planning";

/// Named steps of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Index,
    Plan,
    Execute,
    Audit,
    Validate,
    Apply,
    Retry,
    Skip,
    Abort,
}

impl Stage {
    /// Entry point of every run.
    pub const START: Stage = Stage::Index;

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Index => "index",
            Stage::Plan => "plan",
            Stage::Execute => "execute",
            Stage::Audit => "audit",
            Stage::Validate => "validate",
            Stage::Apply => "apply",
            Stage::Retry => "retry",
            Stage::Skip => "skip",
            Stage::Abort => "abort",
        }
    }
}

/// Where the driver goes after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Stage(Stage),
    End,
}

/// Tunables consumed by the stages and the decision router.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphSettings {
    pub plan_top_k: usize,
    pub execute_top_k: usize,
    pub policy: DecisionPolicy,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            plan_top_k: 10,
            execute_top_k: 5,
            policy: DecisionPolicy::default(),
        }
    }
}

/// Stage functions bound to one set of collaborators.
pub struct StageGraph<'a> {
    collaborators: Collaborators<'a>,
    settings: GraphSettings,
}

impl<'a> StageGraph<'a> {
    pub fn new(collaborators: Collaborators<'a>, settings: GraphSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Run `stage` against a snapshot and return its partial update.
    #[instrument(skip_all, fields(stage = stage.as_str()))]
    pub fn run_stage(&self, stage: Stage, state: &PipelineState) -> StateUpdate {
        debug!("running stage");
        match stage {
            Stage::Index => self.index(state),
            Stage::Plan => self.plan(state),
            Stage::Execute => self.execute(state),
            Stage::Audit => self.audit(state),
            Stage::Validate => self.validate(state),
            Stage::Apply => apply(state),
            Stage::Retry => retry(state),
            Stage::Skip => skip(state),
            Stage::Abort => abort(state),
        }
    }

    /// Pick the edge to follow out of `stage` given the merged state.
    pub fn route(&self, stage: Stage, state: &PipelineState) -> Next {
        match stage {
            Stage::Index => Next::Stage(Stage::Plan),
            Stage::Plan => Next::Stage(Stage::Execute),
            Stage::Execute => Next::Stage(Stage::Audit),
            Stage::Audit => Next::Stage(Stage::Validate),
            Stage::Validate => Next::Stage(match self.decide(state) {
                Decision::Apply => Stage::Apply,
                Decision::Retry => Stage::Retry,
                Decision::Skip => Stage::Skip,
                Decision::Abort => Stage::Abort,
            }),
            Stage::Apply | Stage::Skip => match next_task_or_end(&state.task_tree) {
                Continuation::Continue => Next::Stage(Stage::Execute),
                Continuation::Done => Next::End,
            },
            Stage::Retry => Next::Stage(Stage::Execute),
            Stage::Abort => Next::End,
        }
    }

    /// Decision policy applied to the post-validate state.
    pub fn decide(&self, state: &PipelineState) -> Decision {
        let inputs = DecisionInputs::from_state(state);
        let decision = self.settings.policy.decide(&inputs);
        info!(
            decision = decision.as_str(),
            task_id = state.current_task().map(|t| t.task_id.as_str()),
            retries_used = inputs.retries_used,
            max_retries = inputs.max_retries,
            "decided"
        );
        decision
    }

    fn index(&self, state: &PipelineState) -> StateUpdate {
        let Collaborators {
            indexer, retriever, ..
        } = self.collaborators;

        let result = invoke(CollaboratorKind::Indexer, || indexer.index(&state.repo_path))
            .and_then(|repo_index| {
                let stats = invoke(CollaboratorKind::Retriever, || {
                    retriever.index_repo(&repo_index)
                })?;
                Ok((repo_index, stats))
            });

        match result {
            Ok((repo_index, stats)) => {
                info!(
                    files = repo_index.files.len(),
                    chunks = stats.chunks_indexed,
                    "repository indexed"
                );
                StateUpdate {
                    is_react_project: Some(repo_index.is_react_project),
                    repo_index: Some(repo_index),
                    embedding_stats: Some(stats),
                    ..StateUpdate::default()
                }
            }
            Err(fault) => {
                warn!(%fault, "index failed");
                StateUpdate::error(format!("index stage error: {fault}"))
            }
        }
    }

    fn plan(&self, state: &PipelineState) -> StateUpdate {
        let Collaborators {
            retriever, planner, ..
        } = self.collaborators;

        let result = invoke(CollaboratorKind::Retriever, || {
            retriever.query(&state.directive, self.settings.plan_top_k)
        })
        .and_then(|context| {
            let tasks = invoke(CollaboratorKind::Planner, || {
                planner.decompose(&state.directive, state.repo_index.as_ref(), &context)
            })?;
            Ok((context, tasks))
        });

        match result {
            Ok((context, tasks)) => {
                info!(tasks = tasks.len(), "directive planned");
                let mut bundles = state.context_bundles.clone();
                bundles.insert(PLANNING_BUNDLE.to_string(), context);
                StateUpdate {
                    active_rules: Some(collect_active_rules(&tasks)),
                    task_tree: Some(tasks),
                    context_bundles: Some(bundles),
                    ..StateUpdate::default()
                }
            }
            Err(fault) => {
                warn!(%fault, "planning failed");
                StateUpdate {
                    task_tree: Some(Vec::new()),
                    errors: vec![format!("plan stage error: {fault}")],
                    ..StateUpdate::default()
                }
            }
        }
    }

    fn execute(&self, state: &PipelineState) -> StateUpdate {
        let Collaborators {
            retriever,
            executor,
            ..
        } = self.collaborators;

        let Some(idx) = next_pending_index(&state.task_tree) else {
            warn!("no eligible pending task");
            return StateUpdate {
                current_task_index: Some(None),
                errors: vec!["execute stage error: no eligible pending task found".to_string()],
                ..StateUpdate::default()
            };
        };

        let mut tree = state.task_tree.clone();
        tree[idx].status = TaskStatus::InProgress;
        let task = &tree[idx];
        let task_id = task.task_id.clone();
        info!(task_id = %task_id, "executing task");

        let result = invoke(CollaboratorKind::Retriever, || {
            retriever.query(&task.description, self.settings.execute_top_k)
        })
        .and_then(|context| {
            invoke(CollaboratorKind::Executor, || {
                executor.execute(task, state.repo_index.as_ref(), &context)
            })
        });

        match result {
            Ok(diffs) => {
                debug!(task_id = %task_id, diffs = diffs.len(), "task executed");
                StateUpdate {
                    task_tree: Some(tree),
                    current_task_index: Some(Some(idx)),
                    diffs,
                    ..StateUpdate::default()
                }
            }
            Err(fault) => {
                warn!(task_id = %task_id, %fault, "task execution failed");
                tree[idx].status = TaskStatus::Failed;
                StateUpdate {
                    task_tree: Some(tree),
                    current_task_index: Some(Some(idx)),
                    errors: vec![format!("execute stage error for task {task_id}: {fault}")],
                    ..StateUpdate::default()
                }
            }
        }
    }

    fn audit(&self, state: &PipelineState) -> StateUpdate {
        let diffs: Vec<FileDiff> = match state.current_task() {
            Some(task) => task_diffs(&state.diffs, &task.task_id)
                .into_iter()
                .cloned()
                .collect(),
            None => state.diffs.clone(),
        };

        match invoke(CollaboratorKind::Auditor, || {
            self.collaborators
                .auditor
                .audit(&diffs, state.repo_index.as_ref())
        }) {
            Ok(report) => {
                debug!(passed = report.passed, errors = report.error_count, "audit complete");
                StateUpdate {
                    audit_results: Some(report),
                    ..StateUpdate::default()
                }
            }
            Err(fault) => {
                warn!(%fault, "audit failed");
                StateUpdate {
                    audit_results: Some(AuditReport::synthetic_failure(diffs.len())),
                    errors: vec![format!("audit stage error: {fault}")],
                    ..StateUpdate::default()
                }
            }
        }
    }

    fn validate(&self, state: &PipelineState) -> StateUpdate {
        match invoke(CollaboratorKind::Validator, || {
            self.collaborators
                .validator
                .validate(&state.repo_path, &state.diffs)
        }) {
            Ok(report) => {
                debug!(
                    passed = report.passed,
                    low_trust = report.low_trust_pass,
                    "validation complete"
                );
                StateUpdate {
                    test_results: Some(report),
                    ..StateUpdate::default()
                }
            }
            Err(fault) => {
                warn!(%fault, "validation failed");
                StateUpdate {
                    test_results: Some(TestReport::synthetic_failure()),
                    errors: vec![format!("validate stage error: {fault}")],
                    ..StateUpdate::default()
                }
            }
        }
    }
}

/// Mark the current task `Completed`, whatever its prior status.
///
/// A task the executor marked `Failed` is completed too once audit and tests
/// accepted the state, so its dependents become eligible.
fn apply(state: &PipelineState) -> StateUpdate {
    let Some(idx) = valid_current_index(state) else {
        return StateUpdate::default();
    };
    let task = &state.task_tree[idx];
    if task.status != TaskStatus::InProgress {
        debug!(task_id = %task.task_id, status = task.status.as_str(), "completing task not in progress");
    }

    info!(task_id = %task.task_id, "task applied");
    StateUpdate {
        task_tree: Some(with_status(&state.task_tree, idx, TaskStatus::Completed)),
        ..StateUpdate::default()
    }
}

/// Spend one retry on the current task and send it back to `Pending`.
fn retry(state: &PipelineState) -> StateUpdate {
    let Some(idx) = valid_current_index(state) else {
        return StateUpdate::error("retry stage error: no valid current task, cannot retry");
    };
    let task_id = state.task_tree[idx].task_id.clone();

    let mut counts = state.retry_counts.clone();
    let attempt = {
        let count = counts.entry(task_id.clone()).or_insert(0);
        *count += 1;
        *count
    };
    info!(task_id = %task_id, attempt, max_retries = state.max_retries, "retrying task");

    StateUpdate {
        task_tree: Some(with_status(&state.task_tree, idx, TaskStatus::Pending)),
        errors: retry_feedback(
            &task_id,
            attempt,
            state.audit_results.as_ref(),
            state.test_results.as_ref(),
        ),
        retry_counts: Some(counts),
        ..StateUpdate::default()
    }
}

/// Give up on the current task without halting the run.
fn skip(state: &PipelineState) -> StateUpdate {
    let Some(idx) = valid_current_index(state) else {
        return StateUpdate::default();
    };
    info!(task_id = %state.task_tree[idx].task_id, "task skipped");
    StateUpdate {
        task_tree: Some(with_status(&state.task_tree, idx, TaskStatus::Skipped)),
        ..StateUpdate::default()
    }
}

/// Record why the run stopped. Task statuses are left as they are.
fn abort(state: &PipelineState) -> StateUpdate {
    let task_id = state.current_task().map(|task| task.task_id.as_str());
    let retries_used = task_id.map(|id| state.retries_used(id)).unwrap_or(0);
    let summary = abort_summary(
        task_id,
        retries_used,
        state.max_retries,
        state.audit_results.as_ref(),
        state.test_results.as_ref(),
    );
    warn!(%summary, "pipeline aborted");
    StateUpdate::error(summary)
}

fn valid_current_index(state: &PipelineState) -> Option<usize> {
    state
        .current_task_index
        .filter(|idx| *idx < state.task_tree.len())
}

fn with_status(tree: &[TaskNode], idx: usize, status: TaskStatus) -> Vec<TaskNode> {
    let mut updated = tree.to_vec();
    updated[idx].status = status;
    updated
}

/// Union of every task's `applicable_rules`, first occurrence wins.
fn collect_active_rules(tasks: &[TaskNode]) -> Vec<String> {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .flat_map(|task| task.applicable_rules.iter())
        .filter(|rule| seen.insert(rule.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feedback::ABORT_PREFIX;
    use crate::test_support::{
        ScriptedCollaborators, audit_report, diff, task, task_with_status, test_report,
    };

    fn state_with_tasks(tasks: Vec<TaskNode>) -> PipelineState {
        let mut state = PipelineState::new("directive", "/repo", 2);
        state.task_tree = tasks;
        state
    }

    #[test]
    fn index_populates_repo_index_and_flag() {
        let scripted = ScriptedCollaborators::default();
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());
        let state = PipelineState::new("d", "/repo", 3);

        let update = graph.run_stage(Stage::Index, &state);
        assert_eq!(update.repo_index.as_ref().map(|r| r.repo_path.as_str()), Some("/repo"));
        assert_eq!(update.is_react_project, Some(true));
        assert!(update.embedding_stats.is_some());
        assert!(update.errors.is_empty());
    }

    #[test]
    fn index_failure_records_error_and_leaves_index_absent() {
        let scripted = ScriptedCollaborators::default();
        scripted.indexer.fail_with("permission denied");
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());

        let state = PipelineState::new("d", "/repo", 3);
        let update = graph.run_stage(Stage::Index, &state);
        assert!(update.repo_index.is_none());
        assert_eq!(
            update.errors,
            vec!["index stage error: indexer failed: permission denied".to_string()]
        );
        assert_eq!(graph.route(Stage::Index, &state), Next::Stage(Stage::Plan));
    }

    #[test]
    fn plan_stores_tasks_context_and_rules() {
        let scripted = ScriptedCollaborators::default();
        let mut first = task("a", &[]);
        first.applicable_rules = vec!["R1".to_string(), "R2".to_string()];
        let mut second = task("b", &["a"]);
        second.applicable_rules = vec!["R2".to_string(), "R3".to_string()];
        scripted.planner.set_tasks(vec![first, second]);
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());

        let update = graph.run_stage(Stage::Plan, &PipelineState::new("d", "/repo", 3));
        assert_eq!(update.task_tree.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            update.active_rules,
            Some(vec!["R1".to_string(), "R2".to_string(), "R3".to_string()])
        );
        assert!(
            update
                .context_bundles
                .as_ref()
                .is_some_and(|bundles| bundles.contains_key(PLANNING_BUNDLE))
        );
        assert_eq!(scripted.retriever.queries(), vec![("d".to_string(), 10)]);
    }

    #[test]
    fn plan_failure_empties_task_tree() {
        let scripted = ScriptedCollaborators::default();
        scripted.planner.fail_with("model unavailable");
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());

        let update = graph.run_stage(Stage::Plan, &state_with_tasks(vec![task("stale", &[])]));
        assert_eq!(update.task_tree, Some(Vec::new()));
        assert_eq!(update.errors.len(), 1);
        assert!(update.errors[0].starts_with("plan stage error: planner failed"));
    }

    #[test]
    fn execute_marks_in_progress_and_returns_diffs() {
        let scripted = ScriptedCollaborators::default();
        scripted
            .executor
            .push_result(Ok(vec![diff("src/a.ts", "a")]));
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());
        let state = state_with_tasks(vec![task("b", &["a"]), task("a", &[])]);

        let update = graph.run_stage(Stage::Execute, &state);
        assert_eq!(update.current_task_index, Some(Some(1)));
        let tree = update.task_tree.expect("tree");
        assert_eq!(tree[1].status, TaskStatus::InProgress);
        assert_eq!(tree[0].status, TaskStatus::Pending);
        assert_eq!(update.diffs.len(), 1);
        assert_eq!(scripted.executor.calls(), vec!["a".to_string()]);
    }

    #[test]
    fn execute_without_eligible_task_invalidates_cursor() {
        let scripted = ScriptedCollaborators::default();
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());
        let state = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::Completed)]);

        let update = graph.run_stage(Stage::Execute, &state);
        assert_eq!(update.current_task_index, Some(None));
        assert!(update.diffs.is_empty());
        assert_eq!(update.errors.len(), 1);
        assert!(scripted.executor.calls().is_empty());
    }

    #[test]
    fn execute_fault_marks_task_failed() {
        let scripted = ScriptedCollaborators::default();
        scripted
            .executor
            .push_result(Err("diff did not apply".to_string()));
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());

        let update = graph.run_stage(Stage::Execute, &state_with_tasks(vec![task("a", &[])]));
        let tree = update.task_tree.expect("tree");
        assert_eq!(tree[0].status, TaskStatus::Failed);
        assert!(update.diffs.is_empty());
        assert_eq!(
            update.errors,
            vec!["execute stage error for task a: executor failed: diff did not apply".to_string()]
        );
    }

    #[test]
    fn audit_only_sees_current_task_diffs() {
        let scripted = ScriptedCollaborators::default();
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());
        let mut state = state_with_tasks(vec![
            task_with_status("a", &[], TaskStatus::Completed),
            task_with_status("b", &[], TaskStatus::InProgress),
        ]);
        state.diffs = vec![diff("a.ts", "a"), diff("b.ts", "b"), diff("b2.ts", "b")];
        state.current_task_index = Some(1);

        graph.run_stage(Stage::Audit, &state);
        assert_eq!(
            scripted.auditor.audited(),
            vec![vec!["b.ts".to_string(), "b2.ts".to_string()]]
        );

        state.current_task_index = None;
        graph.run_stage(Stage::Audit, &state);
        assert_eq!(scripted.auditor.audited()[1].len(), 3);
    }

    #[test]
    fn audit_fault_synthesizes_failing_report() {
        let scripted = ScriptedCollaborators::default();
        scripted.auditor.push_result(Err("parser crashed".to_string()));
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());

        let update = graph.run_stage(Stage::Audit, &state_with_tasks(Vec::new()));
        let report = update.audit_results.expect("report");
        assert!(!report.passed);
        assert_eq!(report.error_count, 1);
        assert_eq!(update.errors.len(), 1);
    }

    #[test]
    fn validate_fault_synthesizes_failing_report() {
        let scripted = ScriptedCollaborators::default();
        scripted
            .validator
            .push_result(Err("runner timed out".to_string()));
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());

        let update = graph.run_stage(Stage::Validate, &state_with_tasks(Vec::new()));
        let report = update.test_results.expect("report");
        assert!(!report.passed);
        assert!(!report.low_trust_pass);
        assert_eq!(update.errors, vec!["validate stage error: validator failed: runner timed out"]);
    }

    #[test]
    fn apply_completes_current_task_whatever_its_status() {
        let mut state = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::InProgress)]);
        state.current_task_index = Some(0);
        let update = apply(&state);
        assert_eq!(update.task_tree.expect("tree")[0].status, TaskStatus::Completed);

        let mut failed = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::Failed)]);
        failed.current_task_index = Some(0);
        let update = apply(&failed);
        assert_eq!(update.task_tree.expect("tree")[0].status, TaskStatus::Completed);
        assert!(update.errors.is_empty());
    }

    #[test]
    fn apply_without_current_task_changes_nothing() {
        let state = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::InProgress)]);
        assert_eq!(apply(&state), StateUpdate::default());
    }

    #[test]
    fn retry_increments_count_and_resets_status() {
        let mut state = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::InProgress)]);
        state.current_task_index = Some(0);
        state.audit_results = Some(audit_report(false));
        state.test_results = Some(test_report(10, 0));
        state.retry_counts.insert("a".to_string(), 1);

        let update = retry(&state);
        assert_eq!(update.retry_counts.expect("counts").get("a"), Some(&2));
        assert_eq!(update.task_tree.expect("tree")[0].status, TaskStatus::Pending);
        assert_eq!(update.errors.len(), 2);
        assert!(update.errors.iter().all(|e| e.contains("attempt 2")));
    }

    #[test]
    fn skip_marks_task_skipped() {
        let mut state = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::InProgress)]);
        state.current_task_index = Some(0);
        assert_eq!(skip(&state).task_tree.expect("tree")[0].status, TaskStatus::Skipped);
    }

    #[test]
    fn abort_appends_summary_without_status_change() {
        let mut state = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::InProgress)]);
        state.current_task_index = Some(0);
        let update = abort(&state);
        assert!(update.task_tree.is_none());
        assert_eq!(update.errors.len(), 1);
        assert!(update.errors[0].starts_with(ABORT_PREFIX));
    }

    #[test]
    fn routing_follows_fixed_edges() {
        let scripted = ScriptedCollaborators::default();
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());
        let mut state = state_with_tasks(vec![
            task_with_status("a", &[], TaskStatus::Completed),
            task("b", &["a"]),
        ]);

        assert_eq!(graph.route(Stage::Index, &state), Next::Stage(Stage::Plan));
        assert_eq!(graph.route(Stage::Plan, &state), Next::Stage(Stage::Execute));
        assert_eq!(graph.route(Stage::Execute, &state), Next::Stage(Stage::Audit));
        assert_eq!(graph.route(Stage::Audit, &state), Next::Stage(Stage::Validate));
        assert_eq!(graph.route(Stage::Retry, &state), Next::Stage(Stage::Execute));
        assert_eq!(graph.route(Stage::Abort, &state), Next::End);
        assert_eq!(graph.route(Stage::Apply, &state), Next::Stage(Stage::Execute));

        state.task_tree[1].status = TaskStatus::Completed;
        assert_eq!(graph.route(Stage::Apply, &state), Next::End);
        assert_eq!(graph.route(Stage::Skip, &state), Next::End);
    }

    #[test]
    fn validate_routes_through_decision_policy() {
        let scripted = ScriptedCollaborators::default();
        let graph = StageGraph::new(scripted.collaborators(), GraphSettings::default());
        let mut state = state_with_tasks(vec![task_with_status("a", &[], TaskStatus::InProgress)]);
        state.current_task_index = Some(0);
        state.audit_results = Some(audit_report(true));
        state.test_results = Some(test_report(10, 0));
        assert_eq!(graph.route(Stage::Validate, &state), Next::Stage(Stage::Apply));

        state.audit_results = Some(audit_report(false));
        assert_eq!(graph.route(Stage::Validate, &state), Next::Stage(Stage::Retry));

        state.current_task_index = None;
        assert_eq!(graph.route(Stage::Validate, &state), Next::Stage(Stage::Abort));
    }
}
