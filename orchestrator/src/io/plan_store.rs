//! File-backed task plans with schema + invariant validation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::collaborators::Planner;
use crate::core::invariants::validate_task_tree;
use crate::core::types::{RepoIndex, RetrievalResult, TaskNode, TaskStatus};

const TASK_PLAN_SCHEMA: &str = include_str!("../../schemas/task_plan.schema.json");

/// On-disk plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub tasks: Vec<TaskNode>,
}

/// Bundled task plan schema.
pub fn bundled_schema() -> Result<Value> {
    serde_json::from_str(TASK_PLAN_SCHEMA).context("parse bundled task plan schema")
}

/// Load and validate a plan from disk (schema + invariants).
///
/// Every returned task starts `Pending`, whatever status the file recorded.
pub fn load_plan(schema: &Value, plan_path: &Path) -> Result<Vec<TaskNode>> {
    let contents = fs::read_to_string(plan_path)
        .with_context(|| format!("read plan {}", plan_path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse plan {}", plan_path.display()))?;
    validate_schema(schema, &value)?;
    let plan: TaskPlan = serde_json::from_value(value)
        .with_context(|| format!("deserialize plan {}", plan_path.display()))?;

    let errors = validate_task_tree(&plan.tasks);
    if !errors.is_empty() {
        return Err(anyhow!("plan invariants failed: {}", errors.join("; ")));
    }

    Ok(plan
        .tasks
        .into_iter()
        .map(|task| TaskNode {
            status: TaskStatus::Pending,
            ..task
        })
        .collect())
}

/// Write a plan to disk as pretty JSON.
pub fn write_plan(plan_path: &Path, tasks: &[TaskNode]) -> Result<()> {
    let plan = TaskPlan {
        tasks: tasks.to_vec(),
    };
    let mut buf = serde_json::to_string_pretty(&plan)?;
    buf.push('\n');
    fs::write(plan_path, buf).with_context(|| format!("write plan {}", plan_path.display()))
}

fn validate_schema(schema: &Value, plan: &Value) -> Result<()> {
    let compiled = validator_for(schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(plan) {
        let messages = compiled
            .iter_errors(plan)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "plan schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

/// Planner that replays a precomputed plan file instead of decomposing.
///
/// The directive and retrieval context are ignored; the file is re-read and
/// re-validated on every call.
pub struct FilePlanner {
    plan_path: PathBuf,
    schema: Value,
}

impl FilePlanner {
    /// Planner validating against the bundled schema.
    pub fn new(plan_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            plan_path: plan_path.into(),
            schema: bundled_schema()?,
        })
    }

    pub fn with_schema(plan_path: impl Into<PathBuf>, schema_path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(schema_path)
            .with_context(|| format!("read schema {}", schema_path.display()))?;
        let schema = serde_json::from_str(&contents)
            .with_context(|| format!("parse schema {}", schema_path.display()))?;
        Ok(Self {
            plan_path: plan_path.into(),
            schema,
        })
    }

    pub fn plan_path(&self) -> &Path {
        &self.plan_path
    }
}

impl Planner for FilePlanner {
    fn decompose(
        &self,
        directive: &str,
        _repo_index: Option<&RepoIndex>,
        _context: &[RetrievalResult],
    ) -> Result<Vec<TaskNode>> {
        let tasks = load_plan(&self.schema, &self.plan_path)?;
        debug!(
            directive,
            tasks = tasks.len(),
            plan = %self.plan_path.display(),
            "loaded plan"
        );
        Ok(tasks)
    }
}
