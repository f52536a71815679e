//! Lint engine boundary.
//!
//! The run loop only talks to `LintEngine`; `PatternEngine` is the bundled
//! implementation driven by `[rules.<id>]` configuration.

pub mod pattern;

use crate::error::Result;
use crate::models::LintMessage;
use crate::source::LinterInput;
use crate::todo::{TodoConfig, TodoCounts};
use serde_json::Value as Json;

pub use pattern::PatternEngine;

/// Name recorded in todo records and used to key todo configuration.
pub const ENGINE_NAME: &str = "tmplint";

#[derive(Debug, Clone, PartialEq)]
pub struct FixOutcome {
    pub is_fixed: bool,
    pub output: String,
    /// Findings remaining after fixes were applied.
    pub messages: Vec<LintMessage>,
}

pub trait LintEngine {
    fn verify(&self, input: &LinterInput) -> Result<Vec<LintMessage>>;

    fn verify_and_fix(&self, input: &LinterInput) -> Result<FixOutcome>;

    fn config_for_file(&self, input: &LinterInput) -> Result<Json>;

    fn update_todo(
        &self,
        input: &LinterInput,
        messages: &[LintMessage],
        todo_config: &TodoConfig,
        is_overriding_config: bool,
    ) -> Result<TodoCounts>;

    fn process_todos(
        &self,
        input: &LinterInput,
        messages: Vec<LintMessage>,
        todo_config: &TodoConfig,
        cleanup_requested: bool,
        is_overriding_config: bool,
    ) -> Result<Vec<LintMessage>>;
}
