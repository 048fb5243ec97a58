//! Run loop over the stage graph.
//!
//! The driver is the only writer of [`PipelineState`]: it hands each stage a
//! snapshot, merges the returned update, then follows the routing table until
//! the graph ends or the step ceiling is hit.

use tracing::{info, instrument, warn};

use crate::collaborators::Collaborators;
use crate::core::feedback::has_abort_entry;
use crate::core::state::PipelineState;
use crate::core::types::TaskStatus;
use crate::graph::{Next, Stage, StageGraph};
use crate::io::config::EngineConfig;

/// Reason why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStop {
    /// The graph reached its end through continuation routing.
    Completed,
    /// The abort stage ran.
    Aborted,
    /// The caller-supplied step ceiling was reached before the graph ended.
    StepLimitExceeded { steps: u32, max_steps: u32 },
}

/// One stage invocation, reported to the `on_step` callback after its merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    /// 1-based.
    pub step: u32,
    pub stage: Stage,
    pub next: Next,
}

/// Final state of a run plus how it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub state: PipelineState,
    pub stop: RunStop,
    pub steps: u32,
}

impl PipelineRun {
    /// True when the graph completed, nothing aborted, and every task is `Completed`.
    pub fn succeeded(&self) -> bool {
        self.stop == RunStop::Completed
            && !has_abort_entry(&self.state.errors)
            && self
                .state
                .task_tree
                .iter()
                .all(|task| task.status == TaskStatus::Completed)
    }
}

pub struct Pipeline<'a> {
    graph: StageGraph<'a>,
    max_retries: i64,
    max_steps: u32,
}

impl<'a> Pipeline<'a> {
    pub fn new(collaborators: Collaborators<'a>, config: &EngineConfig) -> Self {
        Self {
            graph: StageGraph::new(collaborators, config.graph_settings()),
            max_retries: config.max_retries,
            max_steps: config.max_steps,
        }
    }

    pub fn graph(&self) -> &StageGraph<'a> {
        &self.graph
    }

    /// Run the pipeline for `directive` against `repo_path` from a fresh state.
    pub fn run(&self, directive: &str, repo_path: &str) -> PipelineRun {
        self.run_state(PipelineState::new(directive, repo_path, self.max_retries))
    }

    /// Run from a caller-built initial state.
    pub fn run_state(&self, state: PipelineState) -> PipelineRun {
        self.run_with(state, |_| {})
    }

    /// Run from `state`, calling `on_step` after every merged stage.
    ///
    /// Stage spans and decisions go to whatever `tracing` subscriber the host
    /// installed; [`crate::logging::init`] sets up the default stderr one.
    #[instrument(skip_all, fields(repo_path = %state.repo_path, max_steps = self.max_steps))]
    pub fn run_with<F: FnMut(&StepRecord)>(
        &self,
        mut state: PipelineState,
        mut on_step: F,
    ) -> PipelineRun {
        let mut stage = Stage::START;
        let mut steps = 0u32;

        loop {
            if steps >= self.max_steps {
                warn!(steps, stage = stage.as_str(), "step ceiling reached");
                return PipelineRun {
                    state,
                    stop: RunStop::StepLimitExceeded {
                        steps,
                        max_steps: self.max_steps,
                    },
                    steps,
                };
            }

            let update = self.graph.run_stage(stage, &state);
            state.merge(update);
            steps += 1;

            let next = self.graph.route(stage, &state);
            on_step(&StepRecord { step: steps, stage, next });

            match next {
                Next::Stage(following) => stage = following,
                Next::End => {
                    let stop = if stage == Stage::Abort {
                        RunStop::Aborted
                    } else {
                        RunStop::Completed
                    };
                    info!(steps, ?stop, errors = state.errors.len(), "run finished");
                    return PipelineRun { state, stop, steps };
                }
            }
        }
    }
}
