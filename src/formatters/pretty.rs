//! Human-readable report grouped by file.

use super::{emit, Formatter, FormatterOptions, RunMetadata};
use crate::console::use_colors;
use crate::error::Result;
use crate::models::{LintMessage, Severity};
use crate::results::{exceeds_max_warnings, AggregatedResults};
use owo_colors::OwoColorize;
use std::fmt::Write as _;

pub struct PrettyFormatter {
    options: FormatterOptions,
}

impl PrettyFormatter {
    pub fn boxed(options: FormatterOptions) -> Box<dyn Formatter> {
        Box::new(Self { options })
    }

    fn colors(&self) -> bool {
        self.options.output_file.is_none() && use_colors()
    }

    fn paint(&self, text: &str, f: impl Fn(&str) -> String) -> String {
        if self.colors() {
            f(text)
        } else {
            text.to_string()
        }
    }

    fn message_line(&self, m: &LintMessage) -> String {
        let (icon, label) = match m.severity {
            Severity::Error => ("✖", "error"),
            Severity::Warning => ("▲", "warning"),
            Severity::Todo => ("◆", "todo"),
        };
        let tag = format!("{} {:<7}", icon, label);
        let tag = match m.severity {
            Severity::Error => self.paint(&tag, |s| s.red().bold().to_string()),
            Severity::Warning => self.paint(&tag, |s| s.yellow().bold().to_string()),
            Severity::Todo => self.paint(&tag, |s| s.blue().bold().to_string()),
        };
        let pos = self.paint(&format!("{}:{}", m.line, m.column), |s| {
            s.bright_black().to_string()
        });
        let rule = self.paint(&m.rule, |s| s.bright_black().to_string());
        format!("  {}  {}  {}  ❲{}❳", pos, tag, m.message, rule)
    }

    /// Full report text; empty when there is nothing to say.
    pub fn render(&self, results: &AggregatedResults, metadata: &RunMetadata) -> String {
        let mut out = String::new();
        let visible = self.options.visible(results);
        let summary = &results.summary;

        let mut current: Option<&str> = None;
        for m in &visible {
            if current != Some(m.file_path.as_str()) {
                if current.is_some() {
                    out.push('\n');
                }
                let _ = writeln!(out, "{}", self.paint(&m.file_path, |s| s.bold().to_string()));
                current = Some(m.file_path.as_str());
            }
            let _ = writeln!(out, "{}", self.message_line(m));
            if self.options.verbose {
                let _ = writeln!(out, "      {}", m.source);
            }
        }

        let errors = summary.error_count;
        let warnings = if self.options.quiet { 0 } else { summary.warning_count };
        if errors + warnings > 0 {
            let line = format!(
                "✖ {} {} ({} {}, {} {})",
                errors + warnings,
                plural(errors + warnings, "problem"),
                errors,
                plural(errors, "error"),
                warnings,
                plural(warnings, "warning"),
            );
            let _ = writeln!(out, "\n{}", self.paint(&line, |s| s.red().bold().to_string()));

            let fix_errors = summary.fixable_error_count;
            let fix_warnings = if self.options.quiet {
                0
            } else {
                summary.fixable_warning_count
            };
            if fix_errors + fix_warnings > 0 && !metadata.fix {
                let _ = writeln!(
                    out,
                    "  {} {} and {} {} potentially fixable with the `--fix` option.",
                    fix_errors,
                    plural(fix_errors, "error"),
                    fix_warnings,
                    plural(fix_warnings, "warning"),
                );
            }
        }

        if summary.todo_count > 0 && !self.options.include_todo {
            let line = format!(
                "◆ {} {} (run with --include-todo to show them)",
                summary.todo_count,
                plural(summary.todo_count, "todo")
            );
            let _ = writeln!(out, "{}", self.paint(&line, |s| s.blue().to_string()));
        }

        if let Some(info) = metadata.todo_info {
            let line = format!(
                "✔ {} {} created, {} {} removed",
                info.added,
                plural(info.added, "todo"),
                info.removed,
                plural(info.removed, "todo")
            );
            let _ = writeln!(out, "{}", self.paint(&line, |s| s.green().to_string()));
        }

        if exceeds_max_warnings(summary, self.options.quiet, metadata.max_warnings) {
            if let Some(max) = metadata.max_warnings {
                let line = format!("tmplint found too many warnings (maximum: {}).", max);
                let _ = writeln!(out, "{}", self.paint(&line, |s| s.yellow().bold().to_string()));
            }
        }

        out.trim_end_matches('\n').to_string()
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

impl Formatter for PrettyFormatter {
    fn print(&self, results: &AggregatedResults, metadata: &RunMetadata) -> Result<()> {
        emit(&self.options, &self.render(results, metadata))
    }
}
