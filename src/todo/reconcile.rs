//! Todo lifecycle: creating todos from current errors and reconciling
//! current findings against stored todos.

use super::{TodoConfig, TodoStorage};
use crate::error::Result;
use crate::models::todo::{storage_key, TodoOp, TodoRecord};
use crate::models::{LintMessage, Severity};
use chrono::{Days, NaiveDate};
use tracing::debug;

pub const INVALID_TODO_RULE: &str = "invalid-todo-violation-rule";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TodoCounts {
    pub added: usize,
    pub removed: usize,
}

/// Pair each message with at most one todo: exact identity first, then the
/// position-independent fallback. Returns the todo index per message and
/// the indices of todos left unmatched.
fn pair(todos: &[TodoRecord], messages: &[&LintMessage]) -> (Vec<Option<usize>>, Vec<usize>) {
    let mut used = vec![false; todos.len()];
    let mut assigned: Vec<Option<usize>> = vec![None; messages.len()];

    for (mi, msg) in messages.iter().enumerate() {
        if let Some(ti) = (0..todos.len()).find(|&ti| !used[ti] && todos[ti].matches_exact(msg)) {
            used[ti] = true;
            assigned[mi] = Some(ti);
        }
    }
    for (mi, msg) in messages.iter().enumerate() {
        if assigned[mi].is_some() {
            continue;
        }
        if let Some(ti) = (0..todos.len()).find(|&ti| !used[ti] && todos[ti].matches_fuzzy(msg)) {
            used[ti] = true;
            assigned[mi] = Some(ti);
        }
    }
    let unmatched = (0..todos.len()).filter(|&ti| !used[ti]).collect();
    (assigned, unmatched)
}

fn add_days(today: NaiveDate, days: Option<u32>) -> Option<NaiveDate> {
    days.and_then(|d| today.checked_add_days(Days::new(u64::from(d))))
}

fn todo_from_message(
    engine: &str,
    msg: &LintMessage,
    config: &TodoConfig,
    today: NaiveDate,
) -> TodoRecord {
    TodoRecord {
        engine: engine.to_string(),
        rule: msg.rule.clone(),
        file_path: storage_key(&msg.file_path).to_string(),
        line: msg.line,
        column: msg.column,
        source: msg.source.clone(),
        created_date: today,
        warn_date: add_days(today, config.days_to_decay.warn),
        error_date: add_days(today, config.days_to_decay.error),
    }
}

/// Severity a finding covered by `todo` should carry on `today`.
pub fn decayed_severity(todo: &TodoRecord, today: NaiveDate) -> Severity {
    if todo.error_date.is_some_and(|d| today >= d) {
        Severity::Error
    } else if todo.warn_date.is_some_and(|d| today >= d) {
        Severity::Warning
    } else {
        Severity::Todo
    }
}

/// Turn the file's current errors into todos.
///
/// Todos with no matching error are removed, except when configuration is
/// overridden on this run: rules outside the override were not evaluated,
/// so their todos cannot be judged stale.
pub fn update_todos(
    storage: &TodoStorage,
    file_path: &str,
    messages: &[LintMessage],
    config: &TodoConfig,
    is_overriding_config: bool,
    today: NaiveDate,
) -> Result<TodoCounts> {
    let existing = storage.read_for_file(file_path)?;
    let errors: Vec<&LintMessage> = messages
        .iter()
        .filter(|m| m.severity == Severity::Error)
        .collect();
    let (assigned, unmatched) = pair(&existing, &errors);

    let mut ops: Vec<TodoOp> = errors
        .iter()
        .zip(assigned.iter())
        .filter(|(_, a)| a.is_none())
        .map(|(m, _)| TodoOp::Add(todo_from_message(storage.engine(), m, config, today)))
        .collect();
    let added = ops.len();

    let mut removed = 0;
    if !is_overriding_config {
        for ti in unmatched {
            ops.push(TodoOp::Remove(existing[ti].clone()));
            removed += 1;
        }
    }
    storage.append(&ops)?;
    debug!(file = %file_path, added, removed, "updated todos");
    Ok(TodoCounts { added, removed })
}

/// Apply todo lifecycle rules to a file's findings.
///
/// Covered findings become `todo`, or `warning`/`error` once their decay
/// dates pass. Stale todos are removed when `cleanup` is set, otherwise
/// each one surfaces as an error asking for `--clean-todo`.
pub fn process_todos(
    storage: &TodoStorage,
    file_path: &str,
    mut messages: Vec<LintMessage>,
    cleanup: bool,
    is_overriding_config: bool,
    today: NaiveDate,
) -> Result<Vec<LintMessage>> {
    let existing = storage.read_for_file(file_path)?;
    if existing.is_empty() {
        return Ok(messages);
    }
    let (assigned, unmatched) = {
        let refs: Vec<&LintMessage> = messages.iter().collect();
        pair(&existing, &refs)
    };
    for (msg, ti) in messages.iter_mut().zip(assigned) {
        if let Some(ti) = ti {
            msg.severity = decayed_severity(&existing[ti], today);
        }
    }

    if is_overriding_config || unmatched.is_empty() {
        return Ok(messages);
    }
    if cleanup {
        let ops: Vec<TodoOp> = unmatched
            .iter()
            .map(|&ti| TodoOp::Remove(existing[ti].clone()))
            .collect();
        debug!(file = %file_path, removed = ops.len(), "cleaned stale todos");
        storage.append(&ops)?;
    } else {
        for ti in unmatched {
            let todo = &existing[ti];
            messages.push(LintMessage {
                rule: INVALID_TODO_RULE.to_string(),
                severity: Severity::Error,
                file_path: file_path.to_string(),
                line: todo.line,
                column: todo.column,
                source: todo.source.clone(),
                message: format!(
                    "Todo violation passes `{}` rule. Please run `tmplint {} --clean-todo` to remove this todo from the todo list.",
                    todo.rule, file_path
                ),
                is_fixable: false,
            });
        }
    }
    Ok(messages)
}
