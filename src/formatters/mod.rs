//! Formatter dispatch.
//!
//! A `FormatterRegistry` maps built-in names (`pretty`, `json`) to
//! factories and delegates every other name to a `FormatterProvider`
//! injected at construction. `multi` builds one delegate per
//! `[[format.formatters]]` entry; all delegates are resolved before any of
//! them prints, so a bad name never leaves partial output behind.

pub mod external;
pub mod json;
pub mod pretty;

use crate::config::FormatterEntry;
use crate::console::Console;
use crate::error::{LintError, Result};
use crate::models::{LintMessage, Severity};
use crate::results::AggregatedResults;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

pub use external::ProcessFormatterProvider;

pub const MULTI: &str = "multi";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodoInfo {
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Facts about the run that formatters may report alongside results.
pub struct RunMetadata {
    /// Present when todos were updated on this run.
    pub todo_info: Option<TodoInfo>,
    pub max_warnings: Option<usize>,
    pub fix: bool,
}

#[derive(Clone)]
pub struct FormatterOptions {
    /// Formatter output; never muted.
    pub console: Rc<dyn Console>,
    /// Status notes such as "report written"; muted on quiet runs.
    pub status: Rc<dyn Console>,
    pub output_file: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
    pub include_todo: bool,
    pub working_dir: PathBuf,
    /// Delegates for `multi`.
    pub formatters: Vec<FormatterEntry>,
}

impl FormatterOptions {
    /// Messages a built-in formatter should show.
    pub fn visible<'r>(&self, results: &'r AggregatedResults) -> Vec<&'r LintMessage> {
        results
            .messages
            .iter()
            .filter(|m| match m.severity {
                Severity::Error => true,
                Severity::Warning => !self.quiet,
                Severity::Todo => self.include_todo,
            })
            .collect()
    }
}

pub trait Formatter {
    fn print(&self, results: &AggregatedResults, metadata: &RunMetadata) -> Result<()>;
}

pub type FormatterFactory = fn(FormatterOptions) -> Box<dyn Formatter>;

/// Resolves names that are not built in.
pub trait FormatterProvider {
    fn load(
        &self,
        name: &str,
        base_dir: &Path,
        options: FormatterOptions,
    ) -> Result<Box<dyn Formatter>>;
}

pub struct FormatterRegistry {
    builtins: Vec<(&'static str, FormatterFactory)>,
    provider: Box<dyn FormatterProvider>,
}

impl FormatterRegistry {
    pub fn new(provider: Box<dyn FormatterProvider>) -> Self {
        let mut registry = Self {
            builtins: Vec::new(),
            provider,
        };
        registry.register("pretty", pretty::PrettyFormatter::boxed);
        registry.register("json", json::JsonFormatter::boxed);
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: FormatterFactory) {
        self.builtins.retain(|(n, _)| *n != name);
        self.builtins.push((name, factory));
    }

    pub fn resolve(&self, name: &str, options: &FormatterOptions) -> Result<Box<dyn Formatter>> {
        if name == MULTI {
            return self.resolve_multi(options);
        }
        if let Some((_, factory)) = self.builtins.iter().find(|(n, _)| *n == name) {
            debug!(formatter = name, "using built-in formatter");
            return Ok(factory(options.clone()));
        }
        debug!(formatter = name, "resolving external formatter");
        self.provider
            .load(name, &options.working_dir, options.clone())
    }

    fn resolve_multi(&self, options: &FormatterOptions) -> Result<Box<dyn Formatter>> {
        if options.formatters.is_empty() {
            return Err(LintError::FormatterLoad {
                name: MULTI.into(),
                cause: "no delegates configured under [[format.formatters]]".into(),
            });
        }
        let mut delegates = Vec::with_capacity(options.formatters.len());
        for entry in &options.formatters {
            if entry.name == MULTI {
                return Err(LintError::FormatterLoad {
                    name: MULTI.into(),
                    cause: "`multi` cannot delegate to itself".into(),
                });
            }
            let mut opts = options.clone();
            opts.output_file = entry
                .output_file
                .as_ref()
                .map(|p| options.working_dir.join(p));
            delegates.push(self.resolve(&entry.name, &opts)?);
        }
        Ok(Box::new(MultiFormatter { delegates }))
    }
}

/// Runs each delegate once, in registration order.
pub struct MultiFormatter {
    delegates: Vec<Box<dyn Formatter>>,
}

impl Formatter for MultiFormatter {
    fn print(&self, results: &AggregatedResults, metadata: &RunMetadata) -> Result<()> {
        for d in &self.delegates {
            d.print(results, metadata)?;
        }
        Ok(())
    }
}

/// Resolve `name` and print once.
pub fn dispatch(
    registry: &FormatterRegistry,
    name: &str,
    options: &FormatterOptions,
    results: &AggregatedResults,
    metadata: &RunMetadata,
) -> Result<()> {
    let formatter = registry.resolve(name, options)?;
    formatter.print(results, metadata)
}

/// Send formatter text to the output file when one is set, else to the
/// output console.
pub(crate) fn emit(options: &FormatterOptions, text: &str) -> Result<()> {
    match &options.output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| LintError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(path, text).map_err(|source| LintError::Write {
                path: path.clone(),
                source,
            })?;
            options
                .status
                .log(&format!("Report written to {}", path.display()));
            Ok(())
        }
        None => {
            if !text.is_empty() {
                options.console.log(text);
            }
            Ok(())
        }
    }
}
