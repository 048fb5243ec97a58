//! Structural invariants of a planned task tree.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::types::{TaskNode, TaskStatus};

/// Check invariants a task tree must satisfy before the engine runs it:
/// - No duplicate task ids
/// - Every dependency references a task in the same tree
/// - The dependency relation is acyclic
/// - At most one task is `InProgress`
pub fn validate_task_tree(tasks: &[TaskNode]) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.task_id.as_str()) {
            errors.push(format!("duplicate task id '{}'", task.task_id));
        }
    }

    for task in tasks {
        for dep in &task.dependencies {
            if !seen.contains(dep.as_str()) {
                errors.push(format!(
                    "{}: dependency '{}' does not reference a planned task",
                    task.task_id, dep
                ));
            }
        }
    }

    let cyclic = tasks_in_cycles(tasks);
    if !cyclic.is_empty() {
        errors.push(format!("dependency cycle among: {}", cyclic.join(", ")));
    }

    let in_progress: Vec<&str> = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::InProgress)
        .map(|task| task.task_id.as_str())
        .collect();
    if in_progress.len() > 1 {
        errors.push(format!(
            "more than one task in progress: {}",
            in_progress.join(", ")
        ));
    }

    errors
}

/// Ids of tasks that cannot be topologically ordered (members of, or blocked
/// behind, a dependency cycle), in stored order.
///
/// Kahn's algorithm; dangling dependencies are ignored here and reported separately.
pub fn tasks_in_cycles(tasks: &[TaskNode]) -> Vec<String> {
    let known: HashSet<&str> = tasks.iter().map(|task| task.task_id.as_str()).collect();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in tasks {
        let unique_deps: HashSet<&str> = task
            .dependencies
            .iter()
            .map(String::as_str)
            .filter(|dep| known.contains(dep))
            .collect();
        *in_degree.entry(task.task_id.as_str()).or_insert(0) += unique_deps.len();
        for dep in unique_deps {
            dependents.entry(dep).or_default().push(task.task_id.as_str());
        }
    }

    let mut queue: VecDeque<&str> = tasks
        .iter()
        .map(|task| task.task_id.as_str())
        .filter(|id| in_degree.get(id).copied() == Some(0))
        .collect();
    let mut ordered = HashSet::new();

    while let Some(id) = queue.pop_front() {
        if !ordered.insert(id) {
            continue;
        }
        for &next in dependents.get(id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    let mut reported = HashSet::new();
    tasks
        .iter()
        .map(|task| task.task_id.as_str())
        .filter(|id| !ordered.contains(id) && reported.insert(*id))
        .map(str::to_string)
        .collect()
}
