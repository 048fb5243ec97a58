//! Pipeline state and the partial-update merge rule.
//!
//! Stages never mutate [`PipelineState`] directly. Each stage reads a snapshot
//! and returns a [`StateUpdate`]; the driver is the only writer and applies it
//! with [`PipelineState::merge`]. Every field is overwritten by the latest
//! update except `diffs` and `errors`, which only ever grow by concatenation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{
    AuditReport, EmbeddingStats, FileDiff, RepoIndex, RetrievalResult, TaskNode, TestReport,
};

/// Upper bound for the per-task retry budget.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Default per-task retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Single mutable ledger threaded through every stage of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub directive: String,
    pub repo_path: String,
    /// Always within `[1, MAX_RETRIES_LIMIT]`.
    pub max_retries: u32,

    pub repo_index: Option<RepoIndex>,
    pub embedding_stats: Option<EmbeddingStats>,
    pub is_react_project: bool,

    pub context_bundles: BTreeMap<String, Vec<RetrievalResult>>,
    pub task_tree: Vec<TaskNode>,
    pub active_rules: Vec<String>,
    /// Index into `task_tree` of the task being worked on; `None` when invalid.
    pub current_task_index: Option<usize>,

    /// Append-only.
    pub diffs: Vec<FileDiff>,
    pub audit_results: Option<AuditReport>,
    pub test_results: Option<TestReport>,

    pub retry_counts: BTreeMap<String, u32>,
    /// Append-only.
    pub errors: Vec<String>,
}

impl PipelineState {
    /// Build the initial state for a run. `max_retries` is clamped, not rejected,
    /// so zero and negative budgets become 1.
    pub fn new(
        directive: impl Into<String>,
        repo_path: impl Into<String>,
        max_retries: i64,
    ) -> Self {
        Self {
            directive: directive.into(),
            repo_path: repo_path.into(),
            max_retries: clamp_max_retries(max_retries),
            repo_index: None,
            embedding_stats: None,
            is_react_project: false,
            context_bundles: BTreeMap::new(),
            task_tree: Vec::new(),
            active_rules: Vec::new(),
            current_task_index: None,
            diffs: Vec::new(),
            audit_results: None,
            test_results: None,
            retry_counts: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Task at `current_task_index`, or `None` when the index is unset or out of bounds.
    pub fn current_task(&self) -> Option<&TaskNode> {
        self.current_task_index.and_then(|idx| self.task_tree.get(idx))
    }

    /// Retries already spent on `task_id`.
    pub fn retries_used(&self, task_id: &str) -> u32 {
        self.retry_counts.get(task_id).copied().unwrap_or(0)
    }

    /// Apply a stage's partial update.
    ///
    /// `diffs` and `errors` are appended after the existing entries; every other
    /// field present in the update replaces the current value.
    pub fn merge(&mut self, update: StateUpdate) {
        let StateUpdate {
            repo_index,
            embedding_stats,
            is_react_project,
            context_bundles,
            task_tree,
            active_rules,
            current_task_index,
            diffs,
            audit_results,
            test_results,
            retry_counts,
            errors,
        } = update;

        if let Some(value) = repo_index {
            self.repo_index = Some(value);
        }
        if let Some(value) = embedding_stats {
            self.embedding_stats = Some(value);
        }
        if let Some(value) = is_react_project {
            self.is_react_project = value;
        }
        if let Some(value) = context_bundles {
            self.context_bundles = value;
        }
        if let Some(value) = task_tree {
            self.task_tree = value;
        }
        if let Some(value) = active_rules {
            self.active_rules = value;
        }
        if let Some(value) = current_task_index {
            self.current_task_index = value;
        }
        if let Some(value) = audit_results {
            self.audit_results = Some(value);
        }
        if let Some(value) = test_results {
            self.test_results = Some(value);
        }
        if let Some(value) = retry_counts {
            self.retry_counts = value;
        }

        self.diffs.extend(diffs);
        self.errors.extend(errors);
    }
}

/// Partial update returned by a stage.
///
/// `None` leaves a field untouched. `diffs` and `errors` hold only the new
/// entries contributed by the stage; an empty list adds nothing and can never
/// clear what is already recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub repo_index: Option<RepoIndex>,
    pub embedding_stats: Option<EmbeddingStats>,
    pub is_react_project: Option<bool>,
    pub context_bundles: Option<BTreeMap<String, Vec<RetrievalResult>>>,
    pub task_tree: Option<Vec<TaskNode>>,
    pub active_rules: Option<Vec<String>>,
    /// `Some(None)` invalidates the cursor.
    pub current_task_index: Option<Option<usize>>,
    pub diffs: Vec<FileDiff>,
    pub audit_results: Option<AuditReport>,
    pub test_results: Option<TestReport>,
    pub retry_counts: Option<BTreeMap<String, u32>>,
    pub errors: Vec<String>,
}

impl StateUpdate {
    /// Update that only records one error string.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Self::default()
        }
    }
}

pub fn clamp_max_retries(max_retries: i64) -> u32 {
    u32::try_from(max_retries.clamp(1, i64::from(MAX_RETRIES_LIMIT))).unwrap_or(MAX_RETRIES_LIMIT)
}
