//! Todo store: persisted suppressions for pre-existing findings.
//!
//! Storage is an append-only operations file (`.lint-todo`) in the working
//! directory, one JSON object per line tagged `add` or `remove`. Folding
//! the operations in order yields the live todo set. Older releases kept a
//! `.lint-todo/` directory; that layout is detected and rejected.
//!
//! Decay configuration (`daysToDecay.warn|error`) is read from
//! `.lint-todorc.json` or the `[todo]` section of the project config, then
//! overridden per field by CLI flags.

pub mod reconcile;

use crate::error::{LintError, Result};
use crate::models::todo::{storage_key, TodoOp, TodoRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use reconcile::{process_todos, update_todos, TodoCounts};

pub const TODO_STORAGE_FILE: &str = ".lint-todo";
pub const TODO_RC_FILE: &str = ".lint-todorc.json";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaysToDecay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<u32>,
}

impl DaysToDecay {
    fn overlay(self, other: DaysToDecay) -> DaysToDecay {
        DaysToDecay {
            warn: other.warn.or(self.warn),
            error: other.error.or(self.error),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Effective todo configuration, shared read-only across a run.
pub struct TodoConfig {
    #[serde(default)]
    pub days_to_decay: DaysToDecay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoValidation {
    pub is_valid: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TodoStorage {
    working_dir: PathBuf,
    engine: String,
    /// Live todos, folded once per run and kept in step with appends.
    live: RefCell<Option<Vec<TodoRecord>>>,
}

impl TodoStorage {
    pub fn new(working_dir: &Path, engine: &str) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            engine: engine.to_string(),
            live: RefCell::new(None),
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn storage_path(&self) -> PathBuf {
        self.working_dir.join(TODO_STORAGE_FILE)
    }

    fn rc_path(&self) -> PathBuf {
        self.working_dir.join(TODO_RC_FILE)
    }

    /// The pre-file layout kept todos in a directory at the storage path.
    pub fn has_legacy_layout(&self) -> bool {
        self.storage_path().is_dir()
    }

    pub fn ensure_current_layout(&self) -> Result<()> {
        if self.has_legacy_layout() {
            return Err(LintError::LegacyTodoStorage(self.storage_path()));
        }
        Ok(())
    }

    /// Check that decay config is declared in at most one place and that
    /// the rc file is readable.
    pub fn validate_config(&self, project: Option<&DaysToDecay>) -> TodoValidation {
        let rc = self.rc_path();
        if !rc.exists() {
            return TodoValidation {
                is_valid: true,
                message: None,
            };
        }
        if let Err(e) = self.read_rc() {
            return TodoValidation {
                is_valid: false,
                message: Some(e.to_string()),
            };
        }
        if project.is_some() {
            return TodoValidation {
                is_valid: false,
                message: Some(format!(
                    "You have specified todo configuration in both {} and the [todo] section of your project config. Please move the configuration into one location.",
                    TODO_RC_FILE
                )),
            };
        }
        TodoValidation {
            is_valid: true,
            message: None,
        }
    }

    fn read_rc(&self) -> Result<Option<TodoConfig>> {
        let rc = self.rc_path();
        if !rc.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&rc).map_err(|source| LintError::Read {
            path: rc.clone(),
            source,
        })?;
        let json: Json = serde_json::from_str(&s).map_err(|e| LintError::Config {
            path: rc.clone(),
            reason: e.to_string(),
        })?;
        match json.get(&self.engine) {
            Some(section) => serde_json::from_value(section.clone())
                .map(Some)
                .map_err(|e| LintError::Config {
                    path: rc,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Resolve the effective todo config: rc file or project section,
    /// then CLI overrides field by field.
    pub fn todo_config(
        &self,
        project: Option<&DaysToDecay>,
        overrides: DaysToDecay,
    ) -> Result<TodoConfig> {
        let base = match self.read_rc()? {
            Some(cfg) => cfg.days_to_decay,
            None => project.copied().unwrap_or_default(),
        };
        let days = base.overlay(overrides);
        if let (Some(warn), Some(error)) = (days.warn, days.error) {
            if warn >= error {
                return Err(LintError::InvalidTodoConfig(format!(
                    "The provided todo configuration contains invalid values. The `warn` value ({}) must be less than the `error` value ({}).",
                    warn, error
                )));
            }
        }
        Ok(TodoConfig {
            days_to_decay: days,
        })
    }

    fn read_ops(&self) -> Result<Vec<TodoOp>> {
        let path = self.storage_path();
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&path).map_err(|source| LintError::Read {
            path: path.clone(),
            source,
        })?;
        let mut ops = Vec::new();
        for (idx, line) in s.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let op: TodoOp = serde_json::from_str(line).map_err(|source| LintError::TodoStorage {
                path: path.clone(),
                line: idx + 1,
                source,
            })?;
            ops.push(op);
        }
        Ok(ops)
    }

    /// Live todos in first-added order.
    pub fn read_all(&self) -> Result<Vec<TodoRecord>> {
        self.with_live(|live| live.to_vec())
    }

    /// Live todos for `file_path`; `./a.hbs` and `a.hbs` are the same file.
    pub fn read_for_file(&self, file_path: &str) -> Result<Vec<TodoRecord>> {
        let key = storage_key(file_path);
        self.with_live(|live| {
            live.iter()
                .filter(|t| storage_key(&t.file_path) == key)
                .cloned()
                .collect()
        })
    }

    fn with_live<T>(&self, f: impl FnOnce(&[TodoRecord]) -> T) -> Result<T> {
        if self.live.borrow().is_none() {
            let live = fold(self.read_ops()?);
            debug!(live = live.len(), "loaded todo storage");
            *self.live.borrow_mut() = Some(live);
        }
        Ok(f(self.live.borrow().as_deref().unwrap_or_default()))
    }

    pub fn append(&self, ops: &[TodoOp]) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let path = self.storage_path();
        let mut buf = String::new();
        for op in ops {
            let line = serde_json::to_string(op).map_err(|source| LintError::TodoStorage {
                path: path.clone(),
                line: 0,
                source,
            })?;
            buf.push_str(&line);
            buf.push('\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LintError::Write {
                path: path.clone(),
                source,
            })?;
        file.write_all(buf.as_bytes())
            .map_err(|source| LintError::Write { path, source })?;
        if let Some(live) = self.live.borrow_mut().as_mut() {
            for op in ops {
                apply(live, op.clone());
            }
        }
        Ok(())
    }

    /// Rewrite storage with only live todos; returns the number of
    /// operation lines dropped.
    pub fn compact(&self) -> Result<usize> {
        let ops = self.read_ops()?;
        if ops.is_empty() {
            return Ok(0);
        }
        let before = ops.len();
        let live = fold(ops);
        let path = self.storage_path();
        let mut buf = String::new();
        for todo in &live {
            let line = serde_json::to_string(&TodoOp::Add(todo.clone())).map_err(|source| {
                LintError::TodoStorage {
                    path: path.clone(),
                    line: 0,
                    source,
                }
            })?;
            buf.push_str(&line);
            buf.push('\n');
        }
        fs::write(&path, buf).map_err(|source| LintError::Write { path, source })?;
        let compacted = before - live.len();
        debug!(compacted, "compacted todo storage");
        *self.live.borrow_mut() = Some(live);
        Ok(compacted)
    }
}

fn apply(live: &mut Vec<TodoRecord>, op: TodoOp) {
    match op {
        TodoOp::Add(todo) => {
            if !live.iter().any(|t| t.same_todo(&todo)) {
                live.push(todo);
            }
        }
        TodoOp::Remove(todo) => live.retain(|t| !t.same_todo(&todo)),
    }
}

fn fold(ops: Vec<TodoOp>) -> Vec<TodoRecord> {
    let mut live: Vec<TodoRecord> = Vec::new();
    for op in ops {
        apply(&mut live, op);
    }
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn record(file: &str, line: usize) -> TodoRecord {
        TodoRecord {
            engine: "tmplint".into(),
            rule: "no-bare-strings".into(),
            file_path: file.into(),
            line,
            column: 0,
            source: "hello".into(),
            created_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            warn_date: None,
            error_date: None,
        }
    }

    #[test]
    fn test_append_fold_and_compact() {
        let dir = tempdir().unwrap();
        let storage = TodoStorage::new(dir.path(), "tmplint");
        storage
            .append(&[
                TodoOp::Add(record("a.hbs", 1)),
                TodoOp::Add(record("a.hbs", 2)),
                TodoOp::Add(record("b.hbs", 1)),
            ])
            .unwrap();
        storage.append(&[TodoOp::Remove(record("a.hbs", 1))]).unwrap();

        let live = storage.read_all().unwrap();
        assert_eq!(live.len(), 2);
        assert_eq!(storage.read_for_file("a.hbs").unwrap(), vec![record("a.hbs", 2)]);

        assert_eq!(storage.compact().unwrap(), 2);
        let raw = fs::read_to_string(storage.storage_path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert_eq!(storage.read_all().unwrap(), live);
        assert_eq!(storage.compact().unwrap(), 0);
    }

    #[test]
    fn test_live_todos_are_loaded_once_and_follow_appends() {
        let dir = tempdir().unwrap();
        let storage = TodoStorage::new(dir.path(), "tmplint");
        storage.append(&[TodoOp::Add(record("a.hbs", 1))]).unwrap();
        assert_eq!(storage.read_all().unwrap().len(), 1);

        // Later reads come from memory, not the file.
        fs::write(storage.storage_path(), "not json\n").unwrap();
        assert_eq!(storage.read_for_file("./a.hbs").unwrap(), vec![record("a.hbs", 1)]);

        storage
            .append(&[
                TodoOp::Add(record("b.hbs", 1)),
                TodoOp::Remove(record("a.hbs", 1)),
            ])
            .unwrap();
        assert!(storage.read_for_file("a.hbs").unwrap().is_empty());
        assert_eq!(storage.read_for_file("b.hbs").unwrap().len(), 1);
    }

    #[test]
    fn test_compact_without_storage_is_noop() {
        let dir = tempdir().unwrap();
        let storage = TodoStorage::new(dir.path(), "tmplint");
        assert_eq!(storage.compact().unwrap(), 0);
        assert!(!storage.storage_path().exists());
    }

    #[test]
    fn test_corrupt_line_reports_position() {
        let dir = tempdir().unwrap();
        let storage = TodoStorage::new(dir.path(), "tmplint");
        fs::write(storage.storage_path(), "\nnot json\n").unwrap();
        let err = storage.read_all().unwrap_err();
        assert!(matches!(err, LintError::TodoStorage { line: 2, .. }));
    }

    #[test]
    fn test_legacy_directory_layout_is_rejected() {
        let dir = tempdir().unwrap();
        let storage = TodoStorage::new(dir.path(), "tmplint");
        assert!(storage.ensure_current_layout().is_ok());
        fs::create_dir_all(dir.path().join(TODO_STORAGE_FILE)).unwrap();
        assert!(storage.has_legacy_layout());
        let err = storage.ensure_current_layout().unwrap_err();
        assert!(err.to_string().contains("--update-todo"));
    }

    #[test]
    fn test_todo_config_precedence_and_validation() {
        let dir = tempdir().unwrap();
        let storage = TodoStorage::new(dir.path(), "tmplint");
        let project = DaysToDecay {
            warn: Some(10),
            error: Some(20),
        };
        let cfg = storage
            .todo_config(
                Some(&project),
                DaysToDecay {
                    warn: Some(5),
                    error: None,
                },
            )
            .unwrap();
        assert_eq!(cfg.days_to_decay.warn, Some(5));
        assert_eq!(cfg.days_to_decay.error, Some(20));

        let err = storage
            .todo_config(
                Some(&project),
                DaysToDecay {
                    warn: Some(30),
                    error: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, LintError::InvalidTodoConfig(_)));
    }

    #[test]
    fn test_rc_file_is_read_per_engine_and_conflicts_with_project() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(TODO_RC_FILE),
            r#"{"tmplint": {"daysToDecay": {"warn": 3, "error": 7}}, "other": {}}"#,
        )
        .unwrap();
        let storage = TodoStorage::new(dir.path(), "tmplint");
        let cfg = storage.todo_config(None, DaysToDecay::default()).unwrap();
        assert_eq!(
            cfg.days_to_decay,
            DaysToDecay {
                warn: Some(3),
                error: Some(7)
            }
        );
        assert!(storage.validate_config(None).is_valid);
        let v = storage.validate_config(Some(&DaysToDecay::default()));
        assert!(!v.is_valid);
        assert!(v.message.unwrap().contains(TODO_RC_FILE));
    }
}
