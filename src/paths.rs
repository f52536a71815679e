//! Path resolution: turns CLI path arguments and ignore settings into an
//! ordered, deduplicated set of files to lint, or the standard-input
//! sentinel.
//!
//! Rules:
//! - No patterns, `-`, or the stdin sentinel anywhere in the list resolves
//!   to exactly `{Stdin}`.
//! - A pattern without glob metacharacters that names an existing file is a
//!   literal path. It is kept unless an explicit ignore pattern matches the
//!   raw pattern string; gitignore is not consulted for literals.
//! - Everything else is a glob, expanded against the working directory,
//!   filtered to template extensions, explicit ignores and gitignore. A glob
//!   that yields nothing fails the whole resolution.

use crate::error::{LintError, Result};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub const STDIN_SENTINEL: &str = "/dev/stdin";

pub const SUPPORTED_EXTENSIONS: &[&str] = &["hbs", "handlebars"];

pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["**/dist/**", "**/tmp/**", "**/node_modules/**"];

const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '{', '}', '!'];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileSpec {
    Stdin,
    Path(String),
}

impl FileSpec {
    pub fn identifier(&self) -> &str {
        match self {
            FileSpec::Stdin => STDIN_SENTINEL,
            FileSpec::Path(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Explicit ignore globs, or ignoring switched off entirely (no default
/// ignores, no gitignore).
pub enum IgnoreSpec {
    Disabled,
    Patterns(Vec<String>),
}

impl IgnoreSpec {
    pub fn defaults() -> Self {
        IgnoreSpec::Patterns(DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect())
    }

    fn uses_gitignore(&self) -> bool {
        matches!(self, IgnoreSpec::Patterns(_))
    }

    fn compile(&self) -> Result<Vec<Pattern>> {
        match self {
            IgnoreSpec::Disabled => Ok(Vec::new()),
            IgnoreSpec::Patterns(pats) => pats
                .iter()
                .map(|p| Pattern::new(p).map_err(LintError::from))
                .collect(),
        }
    }
}

/// Insertion-ordered set of `FileSpec`, deduplicated by identifier.
#[derive(Debug, Default, Clone)]
pub struct ResolvedFiles {
    specs: Vec<FileSpec>,
    seen: HashSet<String>,
}

impl ResolvedFiles {
    pub fn stdin() -> Self {
        let mut files = Self::default();
        files.insert(FileSpec::Stdin);
        files
    }

    /// Returns false when the identifier was already present.
    pub fn insert(&mut self, spec: FileSpec) -> bool {
        if !self.seen.insert(spec.identifier().to_string()) {
            return false;
        }
        self.specs.push(spec);
        true
    }

    pub fn is_stdin(&self) -> bool {
        self.specs.len() == 1 && self.specs[0] == FileSpec::Stdin
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileSpec> {
        self.specs.iter()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.specs.iter().map(FileSpec::identifier).collect()
    }
}

impl IntoIterator for ResolvedFiles {
    type Item = FileSpec;
    type IntoIter = std::vec::IntoIter<FileSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.into_iter()
    }
}

pub fn is_stdin_request(patterns: &[String]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p == "-" || p == STDIN_SENTINEL)
}

/// Resolve CLI patterns to the files to lint.
pub fn resolve(working_dir: &Path, patterns: &[String], ignore: &IgnoreSpec) -> Result<ResolvedFiles> {
    if is_stdin_request(patterns) {
        debug!("resolved input to standard input");
        return Ok(ResolvedFiles::stdin());
    }

    let ignore_patterns = ignore.compile()?;
    let git = if ignore.uses_gitignore() {
        GitIgnore::discover(working_dir)
    } else {
        None
    };

    let mut files = ResolvedFiles::default();
    for pattern in patterns {
        if is_literal_file(working_dir, pattern) {
            if is_ignored(&ignore_patterns, pattern) {
                debug!(pattern = %pattern, "literal path ignored");
            } else {
                files.insert(FileSpec::Path(pattern.clone()));
            }
            continue;
        }
        let matched = expand_glob(working_dir, pattern, &ignore_patterns, git.as_ref())?;
        if matched.is_empty() {
            return Err(LintError::NoFilesMatched(pattern.clone()));
        }
        for id in matched {
            files.insert(FileSpec::Path(id));
        }
    }
    debug!(count = files.len(), "resolved files");
    Ok(files)
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

fn is_literal_file(working_dir: &Path, pattern: &str) -> bool {
    !has_glob_chars(pattern) && working_dir.join(pattern).is_file()
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn is_ignored(ignore: &[Pattern], candidate: &str) -> bool {
    ignore
        .iter()
        .any(|p| p.matches_with(candidate, match_options()))
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Directories expand to everything beneath them.
fn normalize_pattern(working_dir: &Path, pattern: &str) -> String {
    let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
    if trimmed.is_empty() || trimmed == "." {
        return "**/*".to_string();
    }
    if !has_glob_chars(trimmed) && working_dir.join(trimmed).is_dir() {
        return format!("{}/**/*", trimmed.trim_end_matches('/'));
    }
    trimmed.to_string()
}

/// Expand the first `{a,b}` group, recursively. Nested groups are not
/// supported and are left to the glob parser.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close_rel) = pattern[open..].find('}') else {
        return vec![pattern.to_string()];
    };
    let close = open + close_rel;
    let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{}{}{}", head, alt, tail)))
        .collect()
}

fn relative_identifier(working_dir: &Path, path: &Path) -> String {
    let rel = pathdiff::diff_paths(path, working_dir).unwrap_or_else(|| path.to_path_buf());
    rel.to_string_lossy().replace('\\', "/")
}

fn expand_glob(
    working_dir: &Path,
    pattern: &str,
    ignore: &[Pattern],
    git: Option<&GitIgnore>,
) -> Result<Vec<String>> {
    let normalized = normalize_pattern(working_dir, pattern);
    let base = Pattern::escape(&working_dir.to_string_lossy());

    let mut seen: HashSet<String> = HashSet::new();
    let mut matched: Vec<(String, PathBuf)> = Vec::new();
    for alt in expand_braces(&normalized) {
        let full = if Path::new(&alt).is_absolute() {
            alt
        } else {
            format!("{}/{}", base, alt)
        };
        for entry in glob::glob_with(&full, match_options())? {
            let path = entry?;
            if !path.is_file() || !has_supported_extension(&path) {
                continue;
            }
            let id = relative_identifier(working_dir, &path);
            if is_ignored(ignore, &id) || !seen.insert(id.clone()) {
                continue;
            }
            matched.push((id, path));
        }
    }

    if let Some(git) = git {
        let paths: Vec<PathBuf> = matched.iter().map(|(_, p)| p.clone()).collect();
        let ignored = git.ignored(&paths);
        if !ignored.is_empty() {
            matched.retain(|(_, p)| !ignored.contains(p));
        }
    }
    debug!(pattern = %pattern, count = matched.len(), "expanded glob");
    Ok(matched.into_iter().map(|(id, _)| id).collect())
}

/// Batched gitignore checks through `git check-ignore`.
struct GitIgnore {
    repo_root: PathBuf,
}

impl GitIgnore {
    fn discover(dir: &Path) -> Option<Self> {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .arg("rev-parse")
            .arg("--show-toplevel")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            debug!("not inside a git repository; gitignore rules skipped");
            return None;
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Some(Self {
            repo_root: PathBuf::from(root),
        })
    }

    fn ignored(&self, paths: &[PathBuf]) -> HashSet<PathBuf> {
        if paths.is_empty() {
            return HashSet::new();
        }
        let child = Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(["check-ignore", "-z", "--stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match child {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "git check-ignore unavailable");
                return HashSet::new();
            }
        };
        let mut input: Vec<u8> = Vec::new();
        for p in paths {
            input.extend_from_slice(p.to_string_lossy().as_bytes());
            input.push(0);
        }
        // Feed stdin from a separate thread so a full stdout pipe cannot stall us.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                let _ = stdin.write_all(&input);
            })
        });
        let output = child.wait_with_output();
        if let Some(handle) = writer {
            let _ = handle.join();
        }
        match output {
            Ok(out) => out
                .stdout
                .split(|b| *b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| PathBuf::from(String::from_utf8_lossy(s).to_string()))
                .collect(),
            Err(_) => HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn pats(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(p, "<div></div>\n").unwrap();
    }

    #[test]
    fn test_stdin_takes_precedence() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.hbs");
        for list in [
            pats(&[]),
            pats(&["-"]),
            pats(&["a.hbs", "-"]),
            pats(&[STDIN_SENTINEL, "a.hbs"]),
        ] {
            let files = resolve(dir.path(), &list, &IgnoreSpec::defaults()).unwrap();
            assert!(files.is_stdin(), "expected stdin for {:?}", list);
            assert_eq!(files.len(), 1);
        }
    }

    #[test]
    fn test_non_stdin_patterns_never_yield_stdin() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.hbs");
        let files = resolve(dir.path(), &pats(&["a.hbs", "*.hbs"]), &IgnoreSpec::defaults()).unwrap();
        assert!(!files.is_stdin());
        assert!(files.iter().all(|f| *f != FileSpec::Stdin));
    }

    #[test]
    fn test_literal_dedup_and_insertion_order() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.hbs");
        touch(dir.path(), "b.hbs");
        let files = resolve(dir.path(), &pats(&["a.hbs", "a.hbs"]), &IgnoreSpec::defaults()).unwrap();
        assert_eq!(files.identifiers(), vec!["a.hbs"]);

        let files = resolve(dir.path(), &pats(&["b.hbs", "a.hbs", "*.hbs"]), &IgnoreSpec::defaults()).unwrap();
        assert_eq!(files.identifiers(), vec!["b.hbs", "a.hbs"]);
    }

    #[test]
    fn test_glob_without_matches_fails_naming_pattern() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.hbs");
        let err = resolve(dir.path(), &pats(&["a.hbs", "missing/*.hbs"]), &IgnoreSpec::defaults()).unwrap_err();
        assert!(matches!(err, LintError::NoFilesMatched(ref p) if p == "missing/*.hbs"));
        assert!(err.to_string().contains("missing/*.hbs"));
    }

    #[test]
    fn test_glob_filters_extensions_and_expands_directories() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "app/a.hbs");
        touch(dir.path(), "app/nested/b.handlebars");
        touch(dir.path(), "app/c.js");
        let files = resolve(dir.path(), &pats(&["app"]), &IgnoreSpec::defaults()).unwrap();
        let mut ids = files.identifiers();
        ids.sort();
        assert_eq!(ids, vec!["app/a.hbs", "app/nested/b.handlebars"]);
    }

    #[test]
    fn test_brace_patterns_expand() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.hbs");
        touch(dir.path(), "b.handlebars");
        let files = resolve(dir.path(), &pats(&["*.{hbs,handlebars}"]), &IgnoreSpec::defaults()).unwrap();
        assert_eq!(files.identifiers(), vec!["a.hbs", "b.handlebars"]);
        assert_eq!(
            expand_braces("x/{a,b}/*.{c,d}"),
            vec!["x/a/*.c", "x/a/*.d", "x/b/*.c", "x/b/*.d"]
        );
    }

    #[test]
    fn test_default_ignores_apply_to_globs_and_literals() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "src/a.hbs");
        touch(dir.path(), "dist/a.hbs");
        let files = resolve(dir.path(), &pats(&["**/*.hbs"]), &IgnoreSpec::defaults()).unwrap();
        assert_eq!(files.identifiers(), vec!["src/a.hbs"]);

        let files = resolve(dir.path(), &pats(&["dist/a.hbs", "src/a.hbs"]), &IgnoreSpec::defaults()).unwrap();
        assert_eq!(files.identifiers(), vec!["src/a.hbs"]);
    }

    #[test]
    fn test_disabled_ignore_keeps_everything_with_template_extension() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "dist/a.hbs");
        touch(dir.path(), "dist/b.txt");
        let files = resolve(dir.path(), &pats(&["dist/a.hbs"]), &IgnoreSpec::Disabled).unwrap();
        assert_eq!(files.identifiers(), vec!["dist/a.hbs"]);
        let files = resolve(dir.path(), &pats(&["dist/*"]), &IgnoreSpec::Disabled).unwrap();
        assert_eq!(files.identifiers(), vec!["dist/a.hbs"]);
    }

    #[test]
    fn test_literal_ignore_matches_raw_pattern_string() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.hbs");
        let ignore = IgnoreSpec::Patterns(pats(&["b.hbs"]));
        let files = resolve(dir.path(), &pats(&["./b.hbs"]), &ignore).unwrap();
        assert_eq!(files.identifiers(), vec!["./b.hbs"]);
        let files = resolve(dir.path(), &pats(&["b.hbs"]), &ignore).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_ignored_glob_results_count_as_no_match() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "dist/a.hbs");
        let err = resolve(dir.path(), &pats(&["dist/*.hbs"]), &IgnoreSpec::defaults()).unwrap_err();
        assert!(matches!(err, LintError::NoFilesMatched(_)));
    }

    #[test]
    fn test_gitignore_filters_globs_but_not_literals() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let init = std::process::Command::new("git")
            .arg("-C")
            .arg(&root)
            .args(["init", "-q"])
            .status();
        if !matches!(init, Ok(s) if s.success()) {
            // No git on this machine.
            return;
        }
        fs::write(root.join(".gitignore"), "gen/\n").unwrap();
        touch(&root, "app/a.hbs");
        touch(&root, "gen/x.hbs");

        let files = resolve(&root, &pats(&["**/*.hbs"]), &IgnoreSpec::defaults()).unwrap();
        assert_eq!(files.identifiers(), vec!["app/a.hbs"]);

        let files = resolve(&root, &pats(&["gen/x.hbs"]), &IgnoreSpec::defaults()).unwrap();
        assert_eq!(files.identifiers(), vec!["gen/x.hbs"]);

        let files = resolve(&root, &pats(&["**/*.hbs"]), &IgnoreSpec::Disabled).unwrap();
        assert_eq!(files.identifiers(), vec!["app/a.hbs", "gen/x.hbs"]);

        let err = resolve(&root, &pats(&["gen/*.hbs"]), &IgnoreSpec::defaults()).unwrap_err();
        assert!(matches!(err, LintError::NoFilesMatched(p) if p == "gen/*.hbs"));
    }

    #[test]
    fn test_invalid_glob_syntax_propagates() {
        let dir = tempdir().unwrap();
        let err = resolve(dir.path(), &pats(&["***.hbs"]), &IgnoreSpec::defaults()).unwrap_err();
        assert!(matches!(err, LintError::Pattern(_)));
    }
}
