//! Fatal errors that abort a whole invocation.
//!
//! Lint findings never travel through this type; they are plain
//! `LintMessage` data and only influence the exit code via aggregation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LintError {
    #[error("No files matching the pattern were found: \"{0}\"")]
    NoFilesMatched(String),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to read standard input: {0}")]
    Stdin(io::Error),

    #[error("The --print-config option can only be used with a single file, but {0} files were resolved")]
    PrintConfigMultipleFiles(usize),

    #[error("Could not parse specified `--config` as JSON: {0}")]
    InlineConfig(serde_json::Error),

    #[error("Invalid `--rule` value `{0}`, expected <rule>:<severity>")]
    RuleOverride(String),

    #[error("Invalid rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Failed to load config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("{0}")]
    InvalidTodoConfig(String),

    #[error("Found legacy todo storage directory at {0}. Remove it and run `tmplint . --update-todo` to regenerate your todos.")]
    LegacyTodoStorage(PathBuf),

    #[error("Corrupt todo storage entry at {path}:{line}: {source}")]
    TodoStorage {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Cannot load formatter `{name}`: {cause}")]
    FormatterLoad { name: String, cause: String },

    #[error("Formatter `{name}` failed: {cause}")]
    FormatterFailed { name: String, cause: String },

    #[error("{0}")]
    Usage(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, LintError>;
