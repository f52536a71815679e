//! Console capability handed to every component that writes user-facing
//! text, plus the coloured prefixes used by diagnostics.
//!
//! Components never print directly; they receive a `Console` so quiet or
//! machine-readable runs can swap in `SilentConsole`, and tests can
//! capture output with `BufferConsole`.

use owo_colors::OwoColorize;
use std::cell::RefCell;

pub trait Console {
    fn log(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Writes `log` to stdout and `warn`/`error` to stderr.
pub struct StdConsole;

impl Console for StdConsole {
    fn log(&self, msg: &str) {
        println!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        eprintln!("{} {}", warn_prefix(), msg);
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {}", error_prefix(), msg);
    }
}

/// Swallows everything.
pub struct SilentConsole;

impl Console for SilentConsole {
    fn log(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Log,
    Warn,
    Error,
}

/// Records every line in memory.
#[derive(Default)]
pub struct BufferConsole {
    lines: RefCell<Vec<(Channel, String)>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Channel, String)> {
        self.lines.borrow().clone()
    }

    /// Everything written to `log`, joined by newlines.
    pub fn logged(&self) -> String {
        self.lines
            .borrow()
            .iter()
            .filter(|(c, _)| *c == Channel::Log)
            .map(|(_, s)| s.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&self, channel: Channel, msg: &str) {
        self.lines.borrow_mut().push((channel, msg.to_string()));
    }
}

impl Console for BufferConsole {
    fn log(&self, msg: &str) {
        self.push(Channel::Log, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Channel::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Channel::Error, msg);
    }
}

pub fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if use_colors() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn warn_prefix() -> String {
    if use_colors() {
        "warn:".yellow().bold().to_string()
    } else {
        "warn:".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_plain_without_colour() {
        if use_colors() {
            assert!(error_prefix().contains("error:"));
        } else {
            assert_eq!(error_prefix(), "error:");
            assert_eq!(warn_prefix(), "warn:");
        }
    }

    #[test]
    fn test_buffer_console_records_channels_in_order() {
        let c = BufferConsole::new();
        c.log("a");
        c.warn("b");
        c.log("c");
        assert_eq!(c.logged(), "a\nc");
        assert_eq!(c.lines()[1], (Channel::Warn, "b".to_string()));
    }
}
