//! CLI argument parsing via `clap`.

use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tmplint",
    version,
    about = "Lint Handlebars templates",
    long_about = "tmplint — lint Handlebars templates (.hbs, .handlebars) with configurable pattern rules and a todo workflow for pre-existing findings.\n\nConfiguration precedence: CLI > tmplint.toml > defaults.",
    after_help = "Examples:\n  tmplint app/templates\n  tmplint \"app/**/*.hbs\" --format json --output-file report.json\n  cat a.hbs | tmplint --filename app/a.hbs\n  tmplint . --update-todo --todo-days-to-warn 30 --todo-days-to-error 60"
)]
/// Top-level CLI options.
pub struct Cli {
    #[arg(help = "Files, directories or globs to lint; `-` or none reads standard input")]
    pub paths: Vec<String>,

    #[arg(long, help = "Project config file (default: tmplint.toml|yaml|yml in the working directory)")]
    pub config_path: Option<String>,

    #[arg(long, help = "Inline JSON config merged over the project config")]
    pub config: Option<String>,

    #[arg(long, action = ArgAction::Append, help = "Override a rule severity: <rule>:<severity>")]
    pub rule: Vec<String>,

    #[arg(long, help = "File name used for standard input")]
    pub filename: Option<String>,

    #[arg(long, action = ArgAction::SetTrue, help = "Write fixes back to files")]
    pub fix: bool,

    #[arg(long, help = "Output format: pretty|json|multi|<external> (default: pretty)")]
    pub format: Option<String>,

    #[arg(long, help = "Write formatter output to this file")]
    pub output_file: Option<String>,

    #[arg(long, action = ArgAction::SetTrue, help = "Report errors only")]
    pub quiet: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Print source for each finding and debug logs")]
    pub verbose: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Convert current errors into todos")]
    pub update_todo: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Include todo findings in the output")]
    pub include_todo: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Remove todos that no longer match a finding")]
    pub clean_todo: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Compact the todo storage file and exit")]
    pub compact_todo: bool,

    #[arg(long, help = "Days until new todos decay to warnings (requires --update-todo)")]
    pub todo_days_to_warn: Option<u32>,

    #[arg(long, help = "Days until new todos decay to errors (requires --update-todo)")]
    pub todo_days_to_error: Option<u32>,

    #[arg(long, action = ArgAction::Append, help = "Glob of files to ignore (repeatable)")]
    pub ignore_pattern: Vec<String>,

    #[arg(long, action = ArgAction::SetTrue, help = "Disable ignore patterns and gitignore")]
    pub no_ignore_pattern: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Ignore tmplint-disable comments in templates")]
    pub no_inline_config: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Print the effective config for a single file")]
    pub print_config: bool,

    #[arg(long, help = "Fail when the warning count exceeds this number")]
    pub max_warnings: Option<usize>,

    #[arg(long, help = "Working directory (default: current dir)")]
    pub working_directory: Option<String>,
}

/// Bare `tmplint` at an interactive terminal has no input to read. Any
/// argument at all, or piped stdin, means there is work to do.
pub fn wants_usage(arg_count: usize, stdin_is_terminal: bool) -> bool {
    arg_count <= 1 && stdin_is_terminal
}

impl Cli {
    /// Quiet and machine-readable runs mute the status console.
    pub fn mutes_status(&self, format: &str) -> bool {
        self.quiet || format == "json"
    }
}
