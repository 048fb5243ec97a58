//! Contracts for the external collaborators driven by the stage graph.
//!
//! Every collaborator is a synchronous, opaque call from the engine's point of
//! view. Implementations report failure through `anyhow::Result`; the stage
//! boundary turns an `Err` into a [`CollaboratorFault`] value and never lets it
//! escape the run. Tests use scripted implementations from `test_support`.

use std::fmt;

use anyhow::Result;

use crate::core::types::{
    AuditReport, EmbeddingStats, FileDiff, RepoIndex, RetrievalResult, TaskNode, TestReport,
};

/// Builds the repository index a run works against.
pub trait Indexer {
    fn index(&self, repo_path: &str) -> Result<RepoIndex>;
}

/// Embedding-backed retrieval over the indexed repository.
pub trait Retriever {
    /// Index the repository for retrieval. Stats are informational only.
    fn index_repo(&self, repo_index: &RepoIndex) -> Result<EmbeddingStats>;

    fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievalResult>>;
}

/// Decomposes a directive into an ordered task DAG.
///
/// Implementations must reject cycles and dangling dependencies; the engine
/// assumes the returned tree is already a valid DAG.
pub trait Planner {
    fn decompose(
        &self,
        directive: &str,
        repo_index: Option<&RepoIndex>,
        context: &[RetrievalResult],
    ) -> Result<Vec<TaskNode>>;
}

/// Produces proposed edits for one task. An empty list means "no changes".
pub trait Executor {
    fn execute(
        &self,
        task: &TaskNode,
        repo_index: Option<&RepoIndex>,
        context: &[RetrievalResult],
    ) -> Result<Vec<FileDiff>>;
}

/// Static consistency audit of proposed edits.
pub trait Auditor {
    fn audit(&self, diffs: &[FileDiff], repo_index: Option<&RepoIndex>) -> Result<AuditReport>;
}

/// Runs the repository's tests against the proposed edits.
pub trait Validator {
    fn validate(&self, repo_path: &str, diffs: &[FileDiff]) -> Result<TestReport>;
}

/// The full set of collaborators for one run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub indexer: &'a dyn Indexer,
    pub retriever: &'a dyn Retriever,
    pub planner: &'a dyn Planner,
    pub executor: &'a dyn Executor,
    pub auditor: &'a dyn Auditor,
    pub validator: &'a dyn Validator,
}

/// Which collaborator produced a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorKind {
    Indexer,
    Retriever,
    Planner,
    Executor,
    Auditor,
    Validator,
}

impl CollaboratorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CollaboratorKind::Indexer => "indexer",
            CollaboratorKind::Retriever => "retriever",
            CollaboratorKind::Planner => "planner",
            CollaboratorKind::Executor => "executor",
            CollaboratorKind::Auditor => "auditor",
            CollaboratorKind::Validator => "validator",
        }
    }
}

/// A collaborator call that failed, captured as a value at the stage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorFault {
    pub kind: CollaboratorKind,
    pub message: String,
}

impl fmt::Display for CollaboratorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for CollaboratorFault {}

/// Run one collaborator call and capture any error as a [`CollaboratorFault`].
///
/// The full error chain is kept in the message (`{:#}` formatting).
pub fn invoke<T>(
    kind: CollaboratorKind,
    call: impl FnOnce() -> Result<T>,
) -> std::result::Result<T, CollaboratorFault> {
    call().map_err(|err| CollaboratorFault {
        kind,
        message: format!("{err:#}"),
    })
}
