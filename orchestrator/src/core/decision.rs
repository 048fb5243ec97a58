//! Post-validation decision policy.
//!
//! Given the latest audit and test verdicts and the retry ledger, pick exactly
//! one of apply / retry / abort (or skip, when configured). The rules are
//! evaluated in a fixed order:
//!
//! 1. no valid current task -> abort
//! 2. low-trust test pass -> abort
//! 3. audit passed and tests passed -> apply
//! 4. test pass rate below threshold -> abort (no retry budget spent)
//! 5. retries used < budget -> retry
//! 6. budget exhausted -> abort (or skip)

use serde::{Deserialize, Serialize};

use crate::core::state::PipelineState;
use crate::core::types::{AuditReport, TestReport};

/// Minimum acceptable test pass rate before the run aborts outright.
pub const TEST_PASS_RATE_ABORT_THRESHOLD: f64 = 0.85;

/// Branch taken after `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Apply,
    Retry,
    Skip,
    Abort,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Apply => "apply",
            Decision::Retry => "retry",
            Decision::Skip => "skip",
            Decision::Abort => "abort",
        }
    }
}

/// What to do once a task has spent its whole retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Halt the whole run.
    #[default]
    Abort,
    /// Mark the task skipped and let independent tasks proceed.
    Skip,
}

/// Tunables for [`DecisionPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub pass_rate_threshold: f64,
    pub on_exhaustion: ExhaustionPolicy,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            pass_rate_threshold: TEST_PASS_RATE_ABORT_THRESHOLD,
            on_exhaustion: ExhaustionPolicy::Abort,
        }
    }
}

/// Signals the policy looks at, extracted from a state snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInputs<'a> {
    pub has_current_task: bool,
    pub audit: Option<&'a AuditReport>,
    pub tests: Option<&'a TestReport>,
    pub retries_used: u32,
    pub max_retries: u32,
}

impl<'a> DecisionInputs<'a> {
    pub fn from_state(state: &'a PipelineState) -> Self {
        let current = state.current_task();
        Self {
            has_current_task: current.is_some(),
            audit: state.audit_results.as_ref(),
            tests: state.test_results.as_ref(),
            retries_used: current
                .map(|task| state.retries_used(&task.task_id))
                .unwrap_or(0),
            max_retries: state.max_retries,
        }
    }
}

impl DecisionPolicy {
    /// Total over all inputs: always returns a decision, never panics.
    pub fn decide(&self, inputs: &DecisionInputs<'_>) -> Decision {
        if !inputs.has_current_task {
            return Decision::Abort;
        }

        if inputs.tests.is_some_and(|tests| tests.low_trust_pass) {
            return Decision::Abort;
        }

        let audit_passed = inputs.audit.is_some_and(|audit| audit.passed);
        let tests_passed = inputs.tests.is_some_and(|tests| tests.passed);
        if audit_passed && tests_passed {
            return Decision::Apply;
        }

        if let Some(tests) = inputs.tests
            && test_pass_rate(tests) < self.pass_rate_threshold
        {
            return Decision::Abort;
        }

        if inputs.retries_used < inputs.max_retries {
            return Decision::Retry;
        }

        match self.on_exhaustion {
            ExhaustionPolicy::Abort => Decision::Abort,
            ExhaustionPolicy::Skip => Decision::Skip,
        }
    }
}

/// `passed / (passed + failed)` from the post-run counts; 1.0 when nothing ran.
pub fn test_pass_rate(report: &TestReport) -> f64 {
    let Some(run) = &report.post_run else {
        return 1.0;
    };
    let total = u64::from(run.passed) + u64::from(run.failed);
    if total == 0 {
        return 1.0;
    }
    f64::from(run.passed) / total as f64
}
