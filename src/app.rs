//! Whole-invocation orchestration.
//!
//! Order matters: CLI usage checks, effective config, todo layout and
//! config validation, compaction (which exits early), path resolution,
//! engine construction, formatter resolution, the run loop, aggregation
//! and finally presentation. Any fatal error returns before a formatter
//! prints.

use crate::cli::Cli;
use crate::config::{self, Effective};
use crate::console::{Console, SilentConsole};
use crate::engine::{PatternEngine, ENGINE_NAME};
use crate::error::{LintError, Result};
use crate::formatters::{
    FormatterOptions, FormatterRegistry, ProcessFormatterProvider, RunMetadata, TodoInfo,
};
use crate::paths;
use crate::results::{aggregate, exit_status};
use crate::run::{RunLoop, RunOptions, RunOutcome};
use crate::todo::{DaysToDecay, TodoStorage, TODO_STORAGE_FILE};
use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

fn working_dir(cli: &Cli) -> Result<PathBuf> {
    let raw = match cli.working_directory.as_deref() {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().map_err(|source| LintError::Read {
            path: PathBuf::from("."),
            source,
        })?,
    };
    raw.canonicalize()
        .map_err(|source| LintError::Read { path: raw, source })
}

fn check_usage(cli: &Cli) -> Result<()> {
    if (cli.todo_days_to_warn.is_some() || cli.todo_days_to_error.is_some()) && !cli.update_todo {
        return Err(LintError::Usage(
            "Using `--todo-days-to-warn` or `--todo-days-to-error` is only valid with the `--update-todo` option".into(),
        ));
    }
    Ok(())
}

fn formatter_options(
    cli: &Cli,
    eff: &Effective,
    output: &Rc<dyn Console>,
    status: &Rc<dyn Console>,
) -> FormatterOptions {
    FormatterOptions {
        console: output.clone(),
        status: status.clone(),
        output_file: eff.output_file.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        include_todo: cli.include_todo,
        working_dir: eff.working_dir.clone(),
        formatters: eff.formatters.clone(),
    }
}

/// Run one invocation with the default formatter registry.
pub fn execute(cli: &Cli, output: Rc<dyn Console>, stdin: &mut dyn Read) -> Result<i32> {
    let registry = FormatterRegistry::new(Box::new(ProcessFormatterProvider));
    execute_with(cli, &registry, output, stdin)
}

/// Run one invocation and return the process exit code.
pub fn execute_with(
    cli: &Cli,
    registry: &FormatterRegistry,
    output: Rc<dyn Console>,
    stdin: &mut dyn Read,
) -> Result<i32> {
    let root = working_dir(cli)?;
    check_usage(cli)?;
    let eff = config::resolve_effective(cli, &root)?;
    let status: Rc<dyn Console> = if cli.mutes_status(&eff.format) {
        Rc::new(SilentConsole)
    } else {
        output.clone()
    };

    let storage = TodoStorage::new(&root, ENGINE_NAME);
    storage.ensure_current_layout()?;
    let validation = storage.validate_config(eff.todo.as_ref());
    if !validation.is_valid {
        return Err(LintError::InvalidTodoConfig(
            validation
                .message
                .unwrap_or_else(|| "Invalid todo configuration".into()),
        ));
    }

    if cli.compact_todo {
        let removed = storage.compact()?;
        info!(removed, "compacted todo storage");
        status.log(&format!(
            "Removed {} todos in {} storage file",
            removed, TODO_STORAGE_FILE
        ));
        return Ok(0);
    }

    let todo_config = storage.todo_config(
        eff.todo.as_ref(),
        DaysToDecay {
            warn: cli.todo_days_to_warn,
            error: cli.todo_days_to_error,
        },
    )?;

    let files = paths::resolve(&root, &cli.paths, &eff.ignore)?;
    info!(files = files.len(), stdin = files.is_stdin(), "resolved inputs");

    let engine = PatternEngine::new(&eff.engine, storage)?;

    let formatter = if cli.print_config {
        None
    } else {
        debug!(format = %eff.format, "resolving formatter");
        Some(registry.resolve(&eff.format, &formatter_options(cli, &eff, &output, &status))?)
    };

    let options = RunOptions {
        fix: cli.fix,
        update_todo: cli.update_todo,
        clean_todo: cli.clean_todo,
        print_config: cli.print_config,
        stdin_filename: cli.filename.clone(),
    };
    let outcome = RunLoop::new(&root, &engine, &*output, stdin).run(
        files,
        &options,
        &todo_config,
        eff.is_overriding_config,
    )?;
    let acc = match outcome {
        RunOutcome::PrintedConfig => return Ok(0),
        RunOutcome::Completed(acc) => acc,
    };

    if cli.update_todo {
        info!(added = acc.todo_added, removed = acc.todo_removed, "updated todos");
    }
    let metadata = RunMetadata {
        todo_info: cli.update_todo.then_some(TodoInfo {
            added: acc.todo_added,
            removed: acc.todo_removed,
        }),
        max_warnings: cli.max_warnings,
        fix: cli.fix,
    };
    let results = aggregate(acc.results);
    if let Some(formatter) = formatter {
        formatter.print(&results, &metadata)?;
    }
    Ok(exit_status(&results.summary, cli.quiet, cli.max_warnings))
}
