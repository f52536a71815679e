//! Result aggregation and the exit-status policy.

use crate::models::{LintMessage, Severity};
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Counts derived from the message sequence.
pub struct Summary {
    pub error_count: usize,
    pub warning_count: usize,
    pub todo_count: usize,
    pub fixable_error_count: usize,
    pub fixable_warning_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Read-only results handed to formatters; message order is presentation
/// order.
pub struct AggregatedResults {
    pub messages: Vec<LintMessage>,
    pub summary: Summary,
}

impl AggregatedResults {
    pub fn total_problems(&self) -> usize {
        self.summary.error_count + self.summary.warning_count
    }
}

/// Partition messages by severity into counts.
pub fn aggregate(messages: Vec<LintMessage>) -> AggregatedResults {
    let mut summary = Summary::default();
    for m in &messages {
        match m.severity {
            Severity::Error => {
                summary.error_count += 1;
                if m.is_fixable {
                    summary.fixable_error_count += 1;
                }
            }
            Severity::Warning => {
                summary.warning_count += 1;
                if m.is_fixable {
                    summary.fixable_warning_count += 1;
                }
            }
            Severity::Todo => summary.todo_count += 1,
        }
    }
    AggregatedResults { messages, summary }
}

/// True when the warning threshold is configured, applies, and is exceeded.
pub fn exceeds_max_warnings(summary: &Summary, quiet: bool, max_warnings: Option<usize>) -> bool {
    !quiet && max_warnings.is_some_and(|max| summary.warning_count > max)
}

/// 1 on any error or when warnings exceed `max_warnings` outside quiet
/// mode; 0 otherwise.
pub fn exit_status(summary: &Summary, quiet: bool, max_warnings: Option<usize>) -> i32 {
    if summary.error_count > 0 || exceeds_max_warnings(summary, quiet, max_warnings) {
        1
    } else {
        0
    }
}
