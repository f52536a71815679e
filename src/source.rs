//! Source loading: one `FileSpec` in, one `LinterInput` out.

use crate::error::{LintError, Result};
use crate::paths::{FileSpec, STDIN_SENTINEL};
use std::fs;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything the engine needs for a single file.
pub struct LinterInput {
    pub source: String,
    /// As given on the command line; never re-resolved to an absolute path.
    pub file_path: String,
    pub module_id: String,
}

impl LinterInput {
    pub fn new(source: String, file_path: String) -> Self {
        let module_id = module_id(&file_path);
        Self {
            source,
            file_path,
            module_id,
        }
    }
}

/// `file_path` with its extension removed.
pub fn module_id(file_path: &str) -> String {
    let name_start = file_path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match file_path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => file_path[..name_start + dot].to_string(),
        _ => file_path.to_string(),
    }
}

/// Load a file, draining `stdin` to completion for `FileSpec::Stdin`.
pub fn load(
    working_dir: &Path,
    spec: &FileSpec,
    stdin_filename: Option<&str>,
    stdin: &mut dyn Read,
) -> Result<LinterInput> {
    match spec {
        FileSpec::Stdin => {
            let mut source = String::new();
            stdin.read_to_string(&mut source).map_err(LintError::Stdin)?;
            let file_path = stdin_filename.unwrap_or(STDIN_SENTINEL).to_string();
            Ok(LinterInput::new(source, file_path))
        }
        FileSpec::Path(path) => {
            let full = working_dir.join(path);
            let source = fs::read_to_string(&full).map_err(|source| LintError::Read {
                path: full.clone(),
                source,
            })?;
            Ok(LinterInput::new(source, path.clone()))
        }
    }
}
