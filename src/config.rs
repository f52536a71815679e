//! Configuration discovery and effective settings resolution.
//!
//! tmplint reads `tmplint.toml|yaml|yml` from the working directory (or the
//! file named by `--config-path`) and merges it with CLI flags to produce an
//! `Effective` config.
//! Defaults:
//! - `format.name`: `pretty`
//! - `ignore`: `**/dist/**`, `**/tmp/**`, `**/node_modules/**`
//! - `rules`: none
//!
//! Overrides precedence: CLI > config file > defaults. Inline `--config`
//! JSON and `--rule` overrides mark the run as overriding configuration.

use crate::cli::Cli;
use crate::error::{LintError, Result};
use crate::paths::IgnoreSpec;
use crate::todo::DaysToDecay;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILES: &[&str] = &["tmplint.toml", "tmplint.yaml", "tmplint.yml"];

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
/// A configured rule under `[rules.<id>]`.
pub struct RuleConfig {
    /// Regular expression matched against each source line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// error|warn|warning|off (default: error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Replacement applied in fix mode; `$1`-style group references allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl RuleConfig {
    fn overlay(&mut self, other: RuleConfig) {
        if other.pattern.is_some() {
            self.pattern = other.pattern;
        }
        if other.severity.is_some() {
            self.severity = other.severity;
        }
        if other.message.is_some() {
            self.message = other.message;
        }
        if other.fix.is_some() {
            self.fix = other.fix;
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
/// One delegate of the `multi` formatter.
pub struct FormatterEntry {
    pub name: String,
    #[serde(default)]
    pub output_file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Output section under `[format]`.
pub struct FormatCfg {
    pub name: Option<String>,
    pub output_file: Option<String>,
    #[serde(default)]
    pub formatters: Vec<FormatterEntry>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `tmplint.toml|yaml`.
pub struct ProjectConfig {
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
    #[serde(default)]
    pub ignore: Vec<String>,
    pub format: Option<FormatCfg>,
    pub todo: Option<DaysToDecay>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Configuration handed to the lint engine; opaque to the run loop.
pub struct EngineConfig {
    pub rules: BTreeMap<String, RuleConfig>,
    pub inline_config: bool,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by the run after applying precedence.
pub struct Effective {
    pub working_dir: PathBuf,
    pub engine: EngineConfig,
    pub ignore: IgnoreSpec,
    pub format: String,
    pub output_file: Option<PathBuf>,
    pub formatters: Vec<FormatterEntry>,
    pub todo: Option<DaysToDecay>,
    pub is_overriding_config: bool,
}

/// Load a config file, choosing the parser by extension.
fn parse_config_file(path: &Path) -> Result<ProjectConfig> {
    let s = fs::read_to_string(path).map_err(|e| LintError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yaml" || e == "yml");
    let parsed: std::result::Result<ProjectConfig, String> = if is_yaml {
        serde_yaml::from_str(&s).map_err(|e| e.to_string())
    } else {
        toml::from_str(&s).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| LintError::Config {
        path: path.to_path_buf(),
        reason,
    })
}

/// Load `ProjectConfig` from `explicit` or the first file in `CONFIG_FILES`.
///
/// A missing discovered file means defaults; a missing explicit file is an
/// error.
pub fn load_config(root: &Path, explicit: Option<&str>) -> Result<Option<ProjectConfig>> {
    if let Some(p) = explicit {
        let path = root.join(p);
        if !path.is_file() {
            return Err(LintError::Config {
                path,
                reason: "file not found".into(),
            });
        }
        return parse_config_file(&path).map(Some);
    }
    for name in CONFIG_FILES {
        let path = root.join(name);
        if path.is_file() {
            debug!(path = %path.display(), "loading project config");
            return parse_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Parse the inline `--config` JSON (same schema as the config file).
pub fn parse_inline_config(json: &str) -> Result<ProjectConfig> {
    serde_json::from_str(json).map_err(LintError::InlineConfig)
}

/// Parse `<rule>:<severity>`.
pub fn parse_rule_override(raw: &str) -> Result<(String, String)> {
    match raw.split_once(':') {
        Some((rule, sev)) if !rule.trim().is_empty() && !sev.trim().is_empty() => {
            Ok((rule.trim().to_string(), sev.trim().to_string()))
        }
        _ => Err(LintError::RuleOverride(raw.to_string())),
    }
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &Cli, working_dir: &Path) -> Result<Effective> {
    let cfg = load_config(working_dir, cli.config_path.as_deref())?.unwrap_or_default();

    let mut rules = cfg.rules;
    let mut is_overriding_config = false;
    if let Some(raw) = cli.config.as_deref() {
        let inline = parse_inline_config(raw)?;
        for (id, rule) in inline.rules {
            rules.entry(id).or_default().overlay(rule);
        }
        is_overriding_config = true;
    }
    for raw in &cli.rule {
        let (id, severity) = parse_rule_override(raw)?;
        rules.entry(id).or_default().severity = Some(severity);
        is_overriding_config = true;
    }

    let ignore = if cli.no_ignore_pattern {
        IgnoreSpec::Disabled
    } else {
        let mut pats: Vec<String> = if cli.ignore_pattern.is_empty() {
            match IgnoreSpec::defaults() {
                IgnoreSpec::Patterns(p) => p,
                IgnoreSpec::Disabled => Vec::new(),
            }
        } else {
            cli.ignore_pattern.clone()
        };
        pats.extend(cfg.ignore.iter().cloned());
        IgnoreSpec::Patterns(pats)
    };

    let format_cfg = cfg.format.unwrap_or_default();
    let format = cli
        .format
        .clone()
        .or(format_cfg.name)
        .unwrap_or_else(|| "pretty".to_string());
    let output_file = cli
        .output_file
        .clone()
        .or(format_cfg.output_file)
        .map(|p| working_dir.join(p));

    Ok(Effective {
        working_dir: working_dir.to_path_buf(),
        engine: EngineConfig {
            rules,
            inline_config: !cli.no_inline_config,
        },
        ignore,
        format,
        output_file,
        formatters: format_cfg.formatters,
        todo: cfg.todo,
        is_overriding_config,
    })
}
