//! External formatters: executables found in the working directory.
//!
//! `--format foo` looks for `./foo`, then `./tmplint-formatter-foo`. The
//! program receives `{"results": [...], "summary": {...}, "metadata":
//! {...}}` on stdin; whatever it writes to stdout becomes the report.

use super::{emit, Formatter, FormatterOptions, FormatterProvider, RunMetadata};
use crate::error::{LintError, Result};
use crate::results::AggregatedResults;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub const FORMATTER_PREFIX: &str = "tmplint-formatter-";

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessFormatterProvider;

fn candidates(name: &str, base_dir: &Path) -> Vec<PathBuf> {
    let mut out = vec![base_dir.join(name)];
    if !name.starts_with(FORMATTER_PREFIX) {
        out.push(base_dir.join(format!("{}{}", FORMATTER_PREFIX, name)));
    }
    out
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

impl FormatterProvider for ProcessFormatterProvider {
    fn load(
        &self,
        name: &str,
        base_dir: &Path,
        options: FormatterOptions,
    ) -> Result<Box<dyn Formatter>> {
        let tried = candidates(name, base_dir);
        match tried.iter().find(|p| is_executable(p)) {
            Some(program) => {
                debug!(formatter = name, program = %program.display(), "loaded external formatter");
                Ok(Box::new(ProcessFormatter {
                    name: name.to_string(),
                    program: program.clone(),
                    options,
                }))
            }
            None => Err(LintError::FormatterLoad {
                name: name.to_string(),
                cause: format!(
                    "not a built-in formatter and no executable found at {}",
                    tried
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(" or ")
                ),
            }),
        }
    }
}

pub struct ProcessFormatter {
    name: String,
    program: PathBuf,
    options: FormatterOptions,
}

impl ProcessFormatter {
    fn failed(&self, cause: impl ToString) -> LintError {
        LintError::FormatterFailed {
            name: self.name.clone(),
            cause: cause.to_string(),
        }
    }
}

impl Formatter for ProcessFormatter {
    fn print(&self, results: &AggregatedResults, metadata: &RunMetadata) -> Result<()> {
        let payload = json!({
            "results": self.options.visible(results),
            "summary": results.summary,
            "metadata": metadata,
        });
        let bytes = serde_json::to_vec(&payload).map_err(|e| self.failed(e))?;

        let mut child = Command::new(&self.program)
            .current_dir(&self.options.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failed(e))?;
        // The child may fill stdout before it drains stdin.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                let _ = stdin.write_all(&bytes);
            })
        });
        let out = child.wait_with_output().map_err(|e| self.failed(e))?;
        if let Some(handle) = writer {
            let _ = handle.join();
        }

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(self.failed(format!("{}: {}", out.status, stderr.trim())));
        }
        let text = String::from_utf8_lossy(&out.stdout);
        emit(&self.options, text.trim_end_matches('\n'))
    }
}
