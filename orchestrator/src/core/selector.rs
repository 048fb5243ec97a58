//! Deterministic task selection over the planned task tree.
//!
//! Selection only reads task status. Status transitions belong to the stage graph.

use std::collections::HashSet;

use crate::core::types::{FileDiff, TaskNode, TaskStatus};

/// Return the first `Pending` task whose dependencies are all `Completed`.
///
/// Ties are broken by stored order only. Returns `None` when every task is
/// finished or when no pending task is currently eligible.
pub fn next_pending_task(task_tree: &[TaskNode]) -> Option<&TaskNode> {
    next_pending_index(task_tree).map(|idx| &task_tree[idx])
}

/// Position of the task [`next_pending_task`] would select.
pub fn next_pending_index(task_tree: &[TaskNode]) -> Option<usize> {
    let completed: HashSet<&str> = task_tree
        .iter()
        .filter(|task| task.status == TaskStatus::Completed)
        .map(|task| task.task_id.as_str())
        .collect();

    task_tree.iter().position(|task| {
        task.status == TaskStatus::Pending
            && task
                .dependencies
                .iter()
                .all(|dep| completed.contains(dep.as_str()))
    })
}

/// Position of `task_id` in the task tree.
pub fn find_task_index(task_tree: &[TaskNode], task_id: &str) -> Option<usize> {
    task_tree.iter().position(|task| task.task_id == task_id)
}

/// Diffs produced by `task_id`, in recorded order.
pub fn task_diffs<'a>(diffs: &'a [FileDiff], task_id: &str) -> Vec<&'a FileDiff> {
    diffs.iter().filter(|diff| diff.task_id == task_id).collect()
}

/// Routing verdict after a task is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// An eligible pending task remains.
    Continue,
    /// Nothing left to schedule.
    Done,
}

pub fn next_task_or_end(task_tree: &[TaskNode]) -> Continuation {
    if next_pending_task(task_tree).is_some() {
        Continuation::Continue
    } else {
        Continuation::Done
    }
}
