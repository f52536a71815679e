//! Persisted todo records and storage operations.

use super::LintMessage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    pub engine: String,
    pub rule: String,
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    pub source: String,
    pub created_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_date: Option<NaiveDate>,
}

/// Key a file path is stored and matched under: leading `./` segments are
/// dropped so `./a.hbs` and `a.hbs` name the same todos.
pub fn storage_key(file_path: &str) -> &str {
    let mut key = file_path;
    while let Some(rest) = key.strip_prefix("./") {
        key = rest.trim_start_matches('/');
    }
    key
}

impl TodoRecord {
    fn same_file(&self, file_path: &str) -> bool {
        storage_key(&self.file_path) == storage_key(file_path)
    }

    /// Exact identity: same rule, file, position and source text.
    pub fn matches_exact(&self, msg: &LintMessage) -> bool {
        self.rule == msg.rule
            && self.same_file(&msg.file_path)
            && self.line == msg.line
            && self.column == msg.column
            && self.source == msg.source
    }

    /// Position-independent identity, used once exact matching is exhausted.
    pub fn matches_fuzzy(&self, msg: &LintMessage) -> bool {
        self.rule == msg.rule && self.same_file(&msg.file_path) && self.source == msg.source
    }

    pub fn same_todo(&self, other: &TodoRecord) -> bool {
        self.engine == other.engine
            && self.rule == other.rule
            && self.same_file(&other.file_path)
            && self.line == other.line
            && self.column == other.column
            && self.source == other.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
/// One line of the append-only storage file.
pub enum TodoOp {
    Add(TodoRecord),
    Remove(TodoRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_drops_leading_dot_segments() {
        assert_eq!(storage_key("./a.hbs"), "a.hbs");
        assert_eq!(storage_key(".//app/./a.hbs"), "app/./a.hbs");
        assert_eq!(storage_key("././a.hbs"), "a.hbs");
        assert_eq!(storage_key(".hidden/a.hbs"), ".hidden/a.hbs");
        assert_eq!(storage_key("a.hbs"), "a.hbs");
    }
}
