//! Shared deterministic types for orchestrator core logic.
//!
//! These types define stable contracts between the engine and its collaborators.
//! They carry no behavior that depends on external state or I/O.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task node.
///
/// Transitions are owned by the stage graph: `execute` moves a task to
/// `InProgress`, `apply` to `Completed`, `retry` back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        }
    }
}

/// A unit of planned work.
///
/// `dependencies` must only reference other nodes of the same task tree; the
/// planner rejects dangling references and cycles before the engine sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub task_id: String,
    pub description: String,
    pub affected_files: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub applicable_rules: Vec<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

/// A proposed edit to a single file, tagged with the task that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path relative to the repository root.
    pub file_path: String,
    pub original_content: String,
    pub modified_content: String,
    /// Unified diff text.
    pub diff_text: String,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub validation_error: Option<String>,
    pub task_id: String,
}

/// Opaque repository handle produced by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoIndex {
    pub repo_path: String,
    pub files: Vec<String>,
    pub is_react_project: bool,
}

/// A single retrieval hit handed to the planner and executor as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub file_path: String,
    pub content: String,
    pub score: f64,
}

/// Side-effect statistics reported by the retriever after indexing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmbeddingStats {
    pub files_indexed: usize,
    pub chunks_indexed: usize,
}

/// Verdict of the consistency auditor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditReport {
    /// True when no error-severity findings were raised.
    pub passed: bool,
    pub diffs_audited: usize,
    pub error_count: u32,
    #[serde(default)]
    pub warning_count: u32,
}

impl AuditReport {
    /// Report used when the auditor itself faulted.
    pub fn synthetic_failure(diffs_audited: usize) -> Self {
        Self {
            passed: false,
            diffs_audited,
            error_count: 1,
            warning_count: 0,
        }
    }
}

/// Counts from one test-runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestRunResult {
    /// Runner label (e.g. `vitest`, `npm_test`, `llm_fallback`, `none`).
    pub runner: String,
    pub exit_code: i32,
    pub passed: u32,
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
}

/// Verdict of the test validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestReport {
    pub passed: bool,
    #[serde(default)]
    pub pre_run: Option<TestRunResult>,
    #[serde(default)]
    pub post_run: Option<TestRunResult>,
    #[serde(default)]
    pub runner_available: bool,
    /// Set when no real test run was possible and only an advisory judgment
    /// was substituted.
    #[serde(default)]
    pub low_trust_pass: bool,
}

impl TestReport {
    /// Report used when the validator itself faulted.
    pub fn synthetic_failure() -> Self {
        Self {
            passed: false,
            pre_run: None,
            post_run: Some(TestRunResult {
                runner: "none".to_string(),
                exit_code: 1,
                passed: 0,
                failed: 1,
                skipped: 0,
            }),
            runner_available: false,
            low_trust_pass: false,
        }
    }
}
