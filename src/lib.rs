//! tmplint core library.
//!
//! Lints Handlebars templates: resolves path patterns to files (or
//! standard input), drives each file through a lint engine, reconciles the
//! findings against a persisted todo store and hands the aggregated
//! results to a formatter.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Project config discovery and effective settings.
//! - `paths`: Pattern resolution with ignore and gitignore handling.
//! - `source`: Loading a file or standard input into a `LinterInput`.
//! - `engine`: The `LintEngine` boundary and the bundled pattern engine.
//! - `todo`: Todo storage, decay config and reconciliation.
//! - `run`: The per-file run loop.
//! - `results`: Aggregation and exit status.
//! - `formatters`: Built-in, multi and external formatters.
//! - `app`: Orchestration of a whole invocation.
pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod formatters;
pub mod models;
pub mod paths;
pub mod results;
pub mod run;
pub mod source;
pub mod telemetry;
pub mod todo;
