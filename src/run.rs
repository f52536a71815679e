//! Run loop: drives each resolved file through the engine, strictly one
//! file at a time.
//!
//! Per file: load source, then either print its config and stop (print
//! config mode), or verify (fixing and writing back when asked), update
//! todos when asked, reconcile against todos unless reading stdin, and
//! append the messages to the accumulator.

use crate::console::Console;
use crate::engine::LintEngine;
use crate::error::{LintError, Result};
use crate::models::LintMessage;
use crate::paths::{FileSpec, ResolvedFiles};
use crate::source;
use crate::todo::TodoConfig;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub fix: bool,
    pub update_todo: bool,
    pub clean_todo: bool,
    pub print_config: bool,
    pub stdin_filename: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
/// Accumulated results across the whole run.
pub struct RunAccumulator {
    pub results: Vec<LintMessage>,
    pub todo_added: usize,
    pub todo_removed: usize,
}

#[derive(Debug, PartialEq)]
pub enum RunOutcome {
    Completed(RunAccumulator),
    /// Print-config mode printed the file's config; nothing was linted.
    PrintedConfig,
}

pub struct RunLoop<'a> {
    working_dir: &'a Path,
    engine: &'a dyn LintEngine,
    output: &'a dyn Console,
    stdin: &'a mut dyn Read,
}

impl<'a> RunLoop<'a> {
    pub fn new(
        working_dir: &'a Path,
        engine: &'a dyn LintEngine,
        output: &'a dyn Console,
        stdin: &'a mut dyn Read,
    ) -> Self {
        Self {
            working_dir,
            engine,
            output,
            stdin,
        }
    }

    pub fn run(
        &mut self,
        files: ResolvedFiles,
        options: &RunOptions,
        todo_config: &TodoConfig,
        is_overriding_config: bool,
    ) -> Result<RunOutcome> {
        if options.print_config && files.len() > 1 {
            return Err(LintError::PrintConfigMultipleFiles(files.len()));
        }
        let cleanup = options.fix || options.clean_todo;
        let mut acc = RunAccumulator::default();

        for spec in files {
            let input = source::load(
                self.working_dir,
                &spec,
                options.stdin_filename.as_deref(),
                &mut *self.stdin,
            )?;
            debug!(file = %input.file_path, "linting");

            if options.print_config {
                let config = self.engine.config_for_file(&input)?;
                self.output.log(&format!("{:#}", config));
                return Ok(RunOutcome::PrintedConfig);
            }

            let is_stdin = spec == FileSpec::Stdin;
            let messages = if options.fix {
                let outcome = self.engine.verify_and_fix(&input)?;
                if outcome.is_fixed && !is_stdin {
                    let path = self.working_dir.join(&input.file_path);
                    fs::write(&path, &outcome.output)
                        .map_err(|source| LintError::Write { path, source })?;
                    info!(file = %input.file_path, "wrote fixed output");
                }
                outcome.messages
            } else {
                self.engine.verify(&input)?
            };

            if options.update_todo {
                let counts =
                    self.engine
                        .update_todo(&input, &messages, todo_config, is_overriding_config)?;
                acc.todo_added += counts.added;
                acc.todo_removed += counts.removed;
            }

            let messages = if is_stdin {
                messages
            } else {
                self.engine.process_todos(
                    &input,
                    messages,
                    todo_config,
                    cleanup,
                    is_overriding_config,
                )?
            };
            acc.results.extend(messages);
        }
        Ok(RunOutcome::Completed(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use crate::engine::FixOutcome;
    use crate::models::Severity;
    use crate::paths::FileSpec;
    use crate::source::LinterInput;
    use crate::todo::TodoCounts;
    use serde_json::{json, Value as Json};
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// Reports one error per file; in fix mode uppercases the source.
    #[derive(Default)]
    struct FakeEngine {
        calls: RefCell<Vec<String>>,
    }

    impl FakeEngine {
        fn record(&self, what: &str, input: &LinterInput) {
            self.calls
                .borrow_mut()
                .push(format!("{}:{}", what, input.file_path));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn finding(input: &LinterInput, message: &str) -> LintMessage {
            LintMessage {
                rule: "fake".into(),
                severity: Severity::Error,
                file_path: input.file_path.clone(),
                line: 1,
                column: 0,
                source: input.source.clone(),
                message: message.into(),
                is_fixable: false,
            }
        }
    }

    impl LintEngine for FakeEngine {
        fn verify(&self, input: &LinterInput) -> Result<Vec<LintMessage>> {
            self.record("verify", input);
            Ok(vec![Self::finding(input, "plain")])
        }

        fn verify_and_fix(&self, input: &LinterInput) -> Result<FixOutcome> {
            self.record("fix", input);
            let output = input.source.to_uppercase();
            Ok(FixOutcome {
                is_fixed: output != input.source,
                messages: vec![Self::finding(input, "post-fix")],
                output,
            })
        }

        fn config_for_file(&self, input: &LinterInput) -> Result<Json> {
            self.record("config", input);
            Ok(json!({"moduleId": input.module_id}))
        }

        fn update_todo(
            &self,
            input: &LinterInput,
            messages: &[LintMessage],
            _todo_config: &TodoConfig,
            _is_overriding_config: bool,
        ) -> Result<TodoCounts> {
            self.record("update", input);
            Ok(TodoCounts {
                added: messages.len(),
                removed: 1,
            })
        }

        fn process_todos(
            &self,
            input: &LinterInput,
            mut messages: Vec<LintMessage>,
            _todo_config: &TodoConfig,
            cleanup_requested: bool,
            _is_overriding_config: bool,
        ) -> Result<Vec<LintMessage>> {
            self.record(&format!("todos(cleanup={})", cleanup_requested), input);
            for m in &mut messages {
                m.severity = Severity::Todo;
            }
            Ok(messages)
        }
    }

    fn files(items: &[&str]) -> ResolvedFiles {
        let mut f = ResolvedFiles::default();
        for i in items {
            f.insert(FileSpec::Path(i.to_string()));
        }
        f
    }

    fn completed(outcome: RunOutcome) -> RunAccumulator {
        match outcome {
            RunOutcome::Completed(acc) => acc,
            RunOutcome::PrintedConfig => panic!("expected a completed run"),
        }
    }

    #[test]
    fn test_stdin_fix_never_writes_and_skips_reconciliation() {
        let dir = tempdir().unwrap();
        let engine = FakeEngine::default();
        let console = BufferConsole::new();
        let mut stdin = "abc".as_bytes();
        let options = RunOptions {
            fix: true,
            stdin_filename: Some("a.hbs".into()),
            ..RunOptions::default()
        };
        let acc = completed(
            RunLoop::new(dir.path(), &engine, &console, &mut stdin)
                .run(ResolvedFiles::stdin(), &options, &TodoConfig::default(), false)
                .unwrap(),
        );
        assert_eq!(engine.calls(), vec!["fix:a.hbs"]);
        assert_eq!(acc.results.len(), 1);
        assert_eq!(acc.results[0].message, "post-fix");
        assert_eq!(acc.results[0].severity, Severity::Error);
        assert!(!dir.path().join("a.hbs").exists());
    }

    #[test]
    fn test_fix_writes_back_engine_output() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.hbs"), "abc").unwrap();
        let engine = FakeEngine::default();
        let console = BufferConsole::new();
        let mut stdin = std::io::empty();
        let options = RunOptions {
            fix: true,
            ..RunOptions::default()
        };
        let acc = completed(
            RunLoop::new(dir.path(), &engine, &console, &mut stdin)
                .run(files(&["a.hbs"]), &options, &TodoConfig::default(), false)
                .unwrap(),
        );
        assert_eq!(fs::read_to_string(dir.path().join("a.hbs")).unwrap(), "ABC");
        assert_eq!(acc.results[0].message, "post-fix");
        assert_eq!(
            engine.calls(),
            vec!["fix:a.hbs", "todos(cleanup=true):a.hbs"]
        );
    }

    #[test]
    fn test_update_todo_accumulates_in_file_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.hbs"), "a").unwrap();
        fs::write(dir.path().join("b.hbs"), "b").unwrap();
        let engine = FakeEngine::default();
        let console = BufferConsole::new();
        let mut stdin = std::io::empty();
        let options = RunOptions {
            update_todo: true,
            clean_todo: false,
            ..RunOptions::default()
        };
        let acc = completed(
            RunLoop::new(dir.path(), &engine, &console, &mut stdin)
                .run(files(&["b.hbs", "a.hbs"]), &options, &TodoConfig::default(), false)
                .unwrap(),
        );
        assert_eq!(acc.todo_added, 2);
        assert_eq!(acc.todo_removed, 2);
        let order: Vec<&str> = acc.results.iter().map(|m| m.file_path.as_str()).collect();
        assert_eq!(order, vec!["b.hbs", "a.hbs"]);
        assert!(acc.results.iter().all(|m| m.severity == Severity::Todo));
        assert_eq!(
            engine.calls(),
            vec![
                "verify:b.hbs",
                "update:b.hbs",
                "todos(cleanup=false):b.hbs",
                "verify:a.hbs",
                "update:a.hbs",
                "todos(cleanup=false):a.hbs",
            ]
        );
    }

    #[test]
    fn test_print_config_requires_single_file_before_processing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.hbs"), "a").unwrap();
        fs::write(dir.path().join("b.hbs"), "b").unwrap();
        let engine = FakeEngine::default();
        let console = BufferConsole::new();
        let mut stdin = std::io::empty();
        let options = RunOptions {
            print_config: true,
            ..RunOptions::default()
        };
        let err = RunLoop::new(dir.path(), &engine, &console, &mut stdin)
            .run(files(&["a.hbs", "b.hbs"]), &options, &TodoConfig::default(), false)
            .unwrap_err();
        assert!(matches!(err, LintError::PrintConfigMultipleFiles(2)));
        assert!(engine.calls().is_empty());
        assert!(console.lines().is_empty());

        let outcome = RunLoop::new(dir.path(), &engine, &console, &mut stdin)
            .run(files(&["a.hbs"]), &options, &TodoConfig::default(), false)
            .unwrap();
        assert_eq!(outcome, RunOutcome::PrintedConfig);
        assert_eq!(engine.calls(), vec!["config:a.hbs"]);
        assert!(console.logged().contains("\"moduleId\": \"a\""));
    }

    #[test]
    fn test_unreadable_file_aborts_run() {
        let dir = tempdir().unwrap();
        let engine = FakeEngine::default();
        let console = BufferConsole::new();
        let mut stdin = std::io::empty();
        let err = RunLoop::new(dir.path(), &engine, &console, &mut stdin)
            .run(files(&["gone.hbs"]), &RunOptions::default(), &TodoConfig::default(), false)
            .unwrap_err();
        assert!(matches!(err, LintError::Read { .. }));
    }
}
