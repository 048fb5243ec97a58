//! Human-readable retry feedback and abort summaries for the `errors` ledger.

use crate::core::decision::test_pass_rate;
use crate::core::types::{AuditReport, TestReport};

/// Prefix marking the single summary entry written when a run aborts.
pub const ABORT_PREFIX: &str = "ABORT:";

/// Feedback lines appended when `task_id` is sent back for another attempt.
///
/// `attempt` is the retry count after incrementing. One line per available report.
pub fn retry_feedback(
    task_id: &str,
    attempt: u32,
    audit: Option<&AuditReport>,
    tests: Option<&TestReport>,
) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(audit) = audit {
        lines.push(format!(
            "retry [{task_id}] attempt {attempt}: audit_passed={}, findings={} errors",
            audit.passed, audit.error_count
        ));
    }

    if let Some(tests) = tests {
        let rate = format_rate(test_pass_rate(tests));
        match &tests.post_run {
            Some(run) => lines.push(format!(
                "retry [{task_id}] attempt {attempt}: test_pass_rate={rate}, passed={}, failed={}",
                run.passed, run.failed
            )),
            None => lines.push(format!(
                "retry [{task_id}] attempt {attempt}: test_pass_rate={rate}, no post_run data"
            )),
        }
    }

    lines
}

/// Single diagnostic line describing why and where the run stopped.
pub fn abort_summary(
    task_id: Option<&str>,
    retries_used: u32,
    max_retries: u32,
    audit: Option<&AuditReport>,
    tests: Option<&TestReport>,
) -> String {
    let test_summary = tests
        .map(|tests| format_rate(test_pass_rate(tests)))
        .unwrap_or_else(|| "N/A".to_string());
    let audit_summary = audit
        .map(|audit| format!("passed={}, errors={}", audit.passed, audit.error_count))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "{ABORT_PREFIX} pipeline aborted on task {}. Retries used: {retries_used}/{max_retries}. \
         Test pass rate: {test_summary}. Audit: {audit_summary}.",
        task_id.unwrap_or("unknown")
    )
}

/// True when `errors` contains an abort summary.
pub fn has_abort_entry(errors: &[String]) -> bool {
    errors.iter().any(|err| err.starts_with(ABORT_PREFIX))
}

fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{audit_report, test_report};

    #[test]
    fn retry_feedback_summarizes_both_reports() {
        let audit = audit_report(false);
        let tests = test_report(9, 1);
        let lines = retry_feedback("t1", 2, Some(&audit), Some(&tests));
        assert_eq!(
            lines,
            vec![
                "retry [t1] attempt 2: audit_passed=false, findings=1 errors".to_string(),
                "retry [t1] attempt 2: test_pass_rate=90.00%, passed=9, failed=1".to_string(),
            ]
        );
    }

    #[test]
    fn retry_feedback_notes_missing_post_run() {
        let mut tests = test_report(0, 0);
        tests.post_run = None;
        let lines = retry_feedback("t1", 1, None, Some(&tests));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("no post_run data"));
    }

    #[test]
    fn abort_summary_is_prefixed_and_complete() {
        let audit = audit_report(true);
        let tests = test_report(1, 9);
        let summary = abort_summary(Some("t1"), 0, 3, Some(&audit), Some(&tests));
        assert!(summary.starts_with(ABORT_PREFIX));
        assert!(summary.contains("task t1"));
        assert!(summary.contains("Retries used: 0/3"));
        assert!(summary.contains("Test pass rate: 10.00%"));
        assert!(summary.contains("Audit: passed=true, errors=0"));
    }

    #[test]
    fn abort_summary_without_task_or_reports() {
        let summary = abort_summary(None, 0, 3, None, None);
        assert!(summary.contains("task unknown"));
        assert!(summary.contains("Test pass rate: N/A"));
        assert!(summary.contains("Audit: N/A"));
        assert!(has_abort_entry(&[summary]));
        assert!(!has_abort_entry(&["execute stage error".to_string()]));
    }
}
