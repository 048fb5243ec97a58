//! Test-only builders and scripted collaborators.
//!
//! Scripted collaborators answer from a queue of canned results and record the
//! calls they receive. When a queue runs dry they fall back to a passing
//! default so tests only script the interesting steps.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::collaborators::{
    Auditor, Collaborators, Executor, Indexer, Planner, Retriever, Validator,
};
use crate::core::types::{
    AuditReport, EmbeddingStats, FileDiff, RepoIndex, RetrievalResult, TaskNode, TaskStatus,
    TestReport, TestRunResult,
};

/// Canned collaborator outcome; `Err` carries the failure message.
pub type Scripted<T> = std::result::Result<T, String>;

/// Create a pending task with deterministic defaults.
pub fn task(id: &str, dependencies: &[&str]) -> TaskNode {
    TaskNode {
        task_id: id.to_string(),
        description: format!("{id} description"),
        affected_files: vec![format!("src/{id}.ts")],
        dependencies: dependencies.iter().map(|dep| dep.to_string()).collect(),
        status: TaskStatus::Pending,
        applicable_rules: Vec::new(),
        confidence_score: None,
    }
}

pub fn task_with_status(id: &str, dependencies: &[&str], status: TaskStatus) -> TaskNode {
    TaskNode {
        status,
        ..task(id, dependencies)
    }
}

/// Create a valid diff for `file_path` produced by `task_id`.
pub fn diff(file_path: &str, task_id: &str) -> FileDiff {
    FileDiff {
        file_path: file_path.to_string(),
        original_content: "old\n".to_string(),
        modified_content: "new\n".to_string(),
        diff_text: format!("--- a/{file_path}\n+++ b/{file_path}\n-old\n+new\n"),
        is_valid: true,
        validation_error: None,
        task_id: task_id.to_string(),
    }
}

/// Audit verdict; a failing report carries one error finding.
pub fn audit_report(passed: bool) -> AuditReport {
    AuditReport {
        passed,
        diffs_audited: 1,
        error_count: if passed { 0 } else { 1 },
        warning_count: 0,
    }
}

/// Test verdict from a real runner with the given post-run counts.
pub fn test_report(passed: u32, failed: u32) -> TestReport {
    TestReport {
        passed: failed == 0,
        pre_run: None,
        post_run: Some(TestRunResult {
            runner: "vitest".to_string(),
            exit_code: if failed == 0 { 0 } else { 1 },
            passed,
            failed,
            skipped: 0,
        }),
        runner_available: true,
        low_trust_pass: false,
    }
}

/// Advisory-only pass with no real test run behind it.
pub fn low_trust_report() -> TestReport {
    TestReport {
        passed: true,
        pre_run: None,
        post_run: None,
        runner_available: false,
        low_trust_pass: true,
    }
}

fn scripted_failure(failure: &RefCell<Option<String>>) -> Result<()> {
    match failure.borrow().as_ref() {
        Some(message) => Err(anyhow!("{message}")),
        None => Ok(()),
    }
}

fn next_scripted<T>(queue: &RefCell<VecDeque<Scripted<T>>>) -> Option<Result<T>> {
    queue
        .borrow_mut()
        .pop_front()
        .map(|result| result.map_err(|message| anyhow!("{message}")))
}

#[derive(Default)]
pub struct ScriptedIndexer {
    failure: RefCell<Option<String>>,
    not_react: RefCell<bool>,
}

impl ScriptedIndexer {
    pub fn fail_with(&self, message: &str) {
        *self.failure.borrow_mut() = Some(message.to_string());
    }

    pub fn report_non_react(&self) {
        *self.not_react.borrow_mut() = true;
    }
}

impl Indexer for ScriptedIndexer {
    fn index(&self, repo_path: &str) -> Result<RepoIndex> {
        scripted_failure(&self.failure)?;
        Ok(RepoIndex {
            repo_path: repo_path.to_string(),
            files: vec!["src/App.tsx".to_string(), "src/index.ts".to_string()],
            is_react_project: !*self.not_react.borrow(),
        })
    }
}

#[derive(Default)]
pub struct ScriptedRetriever {
    failure: RefCell<Option<String>>,
    queries: RefCell<Vec<(String, usize)>>,
}

impl ScriptedRetriever {
    /// Fail both indexing and queries.
    pub fn fail_with(&self, message: &str) {
        *self.failure.borrow_mut() = Some(message.to_string());
    }

    /// `(text, top_k)` of every query, in call order.
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.borrow().clone()
    }
}

impl Retriever for ScriptedRetriever {
    fn index_repo(&self, repo_index: &RepoIndex) -> Result<EmbeddingStats> {
        scripted_failure(&self.failure)?;
        Ok(EmbeddingStats {
            files_indexed: repo_index.files.len(),
            chunks_indexed: repo_index.files.len() * 2,
        })
    }

    fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        self.queries.borrow_mut().push((text.to_string(), top_k));
        scripted_failure(&self.failure)?;
        Ok(vec![RetrievalResult {
            file_path: "src/App.tsx".to_string(),
            content: text.to_string(),
            score: 0.9,
        }])
    }
}

#[derive(Default)]
pub struct ScriptedPlanner {
    tasks: RefCell<Vec<TaskNode>>,
    failure: RefCell<Option<String>>,
}

impl ScriptedPlanner {
    pub fn set_tasks(&self, tasks: Vec<TaskNode>) {
        *self.tasks.borrow_mut() = tasks;
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.borrow_mut() = Some(message.to_string());
    }
}

impl Planner for ScriptedPlanner {
    fn decompose(
        &self,
        _directive: &str,
        _repo_index: Option<&RepoIndex>,
        _context: &[RetrievalResult],
    ) -> Result<Vec<TaskNode>> {
        scripted_failure(&self.failure)?;
        Ok(self.tasks.borrow().clone())
    }
}

/// Falls back to one diff per affected file once the script is exhausted.
#[derive(Default)]
pub struct ScriptedExecutor {
    results: RefCell<VecDeque<Scripted<Vec<FileDiff>>>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn push_result(&self, result: Scripted<Vec<FileDiff>>) {
        self.results.borrow_mut().push_back(result);
    }

    /// Task ids executed, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Executor for ScriptedExecutor {
    fn execute(
        &self,
        task: &TaskNode,
        _repo_index: Option<&RepoIndex>,
        _context: &[RetrievalResult],
    ) -> Result<Vec<FileDiff>> {
        self.calls.borrow_mut().push(task.task_id.clone());
        if let Some(result) = next_scripted(&self.results) {
            return result;
        }
        Ok(task
            .affected_files
            .iter()
            .map(|path| diff(path, &task.task_id))
            .collect())
    }
}

/// Passes by default.
#[derive(Default)]
pub struct ScriptedAuditor {
    results: RefCell<VecDeque<Scripted<AuditReport>>>,
    audited: RefCell<Vec<Vec<String>>>,
}

impl ScriptedAuditor {
    pub fn push_result(&self, result: Scripted<AuditReport>) {
        self.results.borrow_mut().push_back(result);
    }

    /// File paths handed to each audit call.
    pub fn audited(&self) -> Vec<Vec<String>> {
        self.audited.borrow().clone()
    }
}

impl Auditor for ScriptedAuditor {
    fn audit(&self, diffs: &[FileDiff], _repo_index: Option<&RepoIndex>) -> Result<AuditReport> {
        self.audited
            .borrow_mut()
            .push(diffs.iter().map(|d| d.file_path.clone()).collect());
        if let Some(result) = next_scripted(&self.results) {
            return result;
        }
        Ok(AuditReport {
            diffs_audited: diffs.len(),
            ..audit_report(true)
        })
    }
}

/// Passes by default (10 passed, 0 failed).
#[derive(Default)]
pub struct ScriptedValidator {
    results: RefCell<VecDeque<Scripted<TestReport>>>,
    calls: RefCell<usize>,
}

impl ScriptedValidator {
    pub fn push_result(&self, result: Scripted<TestReport>) {
        self.results.borrow_mut().push_back(result);
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl Validator for ScriptedValidator {
    fn validate(&self, _repo_path: &str, _diffs: &[FileDiff]) -> Result<TestReport> {
        *self.calls.borrow_mut() += 1;
        if let Some(result) = next_scripted(&self.results) {
            return result;
        }
        Ok(test_report(10, 0))
    }
}

/// One of each scripted collaborator.
#[derive(Default)]
pub struct ScriptedCollaborators {
    pub indexer: ScriptedIndexer,
    pub retriever: ScriptedRetriever,
    pub planner: ScriptedPlanner,
    pub executor: ScriptedExecutor,
    pub auditor: ScriptedAuditor,
    pub validator: ScriptedValidator,
}

impl ScriptedCollaborators {
    /// Scripted set whose planner returns `tasks`.
    pub fn with_tasks(tasks: Vec<TaskNode>) -> Self {
        let scripted = Self::default();
        scripted.planner.set_tasks(tasks);
        scripted
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            indexer: &self.indexer,
            retriever: &self.retriever,
            planner: &self.planner,
            executor: &self.executor,
            auditor: &self.auditor,
            validator: &self.validator,
        }
    }
}

/// Temporary directory for file-backed plans and run artifacts.
pub struct TestWorkspace {
    temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write `contents` to `relative` under the workspace and return the full path.
    pub fn write_file(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}
