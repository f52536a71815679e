//! Shared data models for lint findings and persisted todos.

pub mod todo;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Severity classification consumed by aggregation.
///
/// `Todo` marks a finding suppressed by a live todo record.
pub enum Severity {
    Todo,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Todo => write!(f, "todo"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A single finding reported by the lint engine.
pub struct LintMessage {
    pub rule: String,
    pub severity: Severity,
    pub file_path: String,
    /// 1-based.
    pub line: usize,
    /// 0-based.
    pub column: usize,
    pub source: String,
    pub message: String,
    #[serde(default)]
    pub is_fixable: bool,
}
