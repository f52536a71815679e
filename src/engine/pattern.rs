//! Pattern engine: regex rules from configuration, evaluated per line.
//!
//! Each `[rules.<id>]` entry yields a finding per match with the rule's
//! `severity` (default `error`) and `message` (default derived from the
//! rule id). Rules with a `fix` replacement are fixable.
//!
//! Inline configuration: `{{! tmplint-disable }}` turns every rule off for
//! the file, `{{! tmplint-disable a b }}` turns off the listed rules. These
//! comments are ignored when inline config is disabled.

use super::{FixOutcome, LintEngine};
use crate::config::{EngineConfig, RuleConfig};
use crate::error::{LintError, Result};
use crate::models::{LintMessage, Severity};
use crate::source::LinterInput;
use crate::todo::{self, TodoConfig, TodoCounts, TodoStorage};
use regex::Regex;
use serde_json::{json, Map, Value as Json};
use std::collections::HashSet;
use std::sync::OnceLock;

struct CompiledRule {
    id: String,
    regex: Regex,
    severity: Severity,
    message: String,
    fix: Option<String>,
}

pub struct PatternEngine {
    rules: Vec<CompiledRule>,
    inline_config: bool,
    todos: TodoStorage,
}

enum Disabled {
    Nothing,
    All,
    Rules(HashSet<String>),
}

fn inline_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{!(?:--)?\s*tmplint-disable(?:\s+([^}]*?))?\s*(?:--)?\}\}")
            .expect("inline directive regex is valid")
    })
}

/// `None` means the rule is switched off.
fn parse_severity(rule: &str, raw: Option<&str>) -> Result<Option<Severity>> {
    match raw.unwrap_or("error") {
        "error" => Ok(Some(Severity::Error)),
        "warn" | "warning" => Ok(Some(Severity::Warning)),
        "off" => Ok(None),
        other => Err(LintError::InvalidRule {
            rule: rule.to_string(),
            reason: format!("unknown severity `{}` (expected error|warn|off)", other),
        }),
    }
}

fn compile_rule(id: &str, cfg: &RuleConfig) -> Result<Option<CompiledRule>> {
    let Some(severity) = parse_severity(id, cfg.severity.as_deref())? else {
        return Ok(None);
    };
    let pattern = cfg.pattern.as_deref().ok_or_else(|| LintError::InvalidRule {
        rule: id.to_string(),
        reason: "missing `pattern`".into(),
    })?;
    let regex = Regex::new(pattern).map_err(|e| LintError::InvalidRule {
        rule: id.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(CompiledRule {
        id: id.to_string(),
        regex,
        severity,
        message: cfg
            .message
            .clone()
            .unwrap_or_else(|| format!("Disallowed pattern (rule `{}`)", id)),
        fix: cfg.fix.clone(),
    }))
}

impl PatternEngine {
    pub fn new(config: &EngineConfig, todos: TodoStorage) -> Result<Self> {
        let mut rules = Vec::new();
        for (id, cfg) in &config.rules {
            if let Some(rule) = compile_rule(id, cfg)? {
                rules.push(rule);
            }
        }
        Ok(Self {
            rules,
            inline_config: config.inline_config,
            todos,
        })
    }

    fn disabled(&self, source: &str) -> Disabled {
        if !self.inline_config {
            return Disabled::Nothing;
        }
        let mut names: HashSet<String> = HashSet::new();
        for cap in inline_directive().captures_iter(source) {
            match cap.get(1).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()) {
                None => return Disabled::All,
                Some(list) => names.extend(list.split_whitespace().map(str::to_string)),
            }
        }
        if names.is_empty() {
            Disabled::Nothing
        } else {
            Disabled::Rules(names)
        }
    }

    fn active_rules(&self, source: &str) -> Vec<&CompiledRule> {
        match self.disabled(source) {
            Disabled::Nothing => self.rules.iter().collect(),
            Disabled::All => Vec::new(),
            Disabled::Rules(names) => self.rules.iter().filter(|r| !names.contains(&r.id)).collect(),
        }
    }

    fn check(&self, source: &str, file_path: &str) -> Vec<LintMessage> {
        let rules = self.active_rules(source);
        let mut messages = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            for rule in &rules {
                for m in rule.regex.find_iter(line) {
                    if m.as_str().is_empty() {
                        continue;
                    }
                    messages.push(LintMessage {
                        rule: rule.id.clone(),
                        severity: rule.severity,
                        file_path: file_path.to_string(),
                        line: idx + 1,
                        column: line[..m.start()].chars().count(),
                        source: m.as_str().to_string(),
                        message: rule.message.clone(),
                        is_fixable: rule.fix.is_some(),
                    });
                }
            }
        }
        messages
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

impl LintEngine for PatternEngine {
    fn verify(&self, input: &LinterInput) -> Result<Vec<LintMessage>> {
        Ok(self.check(&input.source, &input.file_path))
    }

    fn verify_and_fix(&self, input: &LinterInput) -> Result<FixOutcome> {
        let mut output = input.source.clone();
        for rule in self.active_rules(&input.source) {
            if let Some(fix) = rule.fix.as_deref() {
                output = rule.regex.replace_all(&output, fix).into_owned();
            }
        }
        let messages = self.check(&output, &input.file_path);
        Ok(FixOutcome {
            is_fixed: output != input.source,
            output,
            messages,
        })
    }

    fn config_for_file(&self, input: &LinterInput) -> Result<Json> {
        let mut rules = Map::new();
        for rule in self.active_rules(&input.source) {
            rules.insert(
                rule.id.clone(),
                json!({
                    "severity": rule.severity,
                    "pattern": rule.regex.as_str(),
                    "message": rule.message,
                    "fix": rule.fix,
                }),
            );
        }
        Ok(json!({
            "filePath": input.file_path,
            "moduleId": input.module_id,
            "inlineConfig": self.inline_config,
            "rules": rules,
        }))
    }

    fn update_todo(
        &self,
        input: &LinterInput,
        messages: &[LintMessage],
        todo_config: &TodoConfig,
        is_overriding_config: bool,
    ) -> Result<TodoCounts> {
        todo::update_todos(
            &self.todos,
            &input.file_path,
            messages,
            todo_config,
            is_overriding_config,
            today(),
        )
    }

    fn process_todos(
        &self,
        input: &LinterInput,
        messages: Vec<LintMessage>,
        _todo_config: &TodoConfig,
        cleanup_requested: bool,
        is_overriding_config: bool,
    ) -> Result<Vec<LintMessage>> {
        todo::process_todos(
            &self.todos,
            &input.file_path,
            messages,
            cleanup_requested,
            is_overriding_config,
            today(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn rule(pattern: &str, severity: &str, fix: Option<&str>) -> RuleConfig {
        RuleConfig {
            pattern: Some(pattern.into()),
            severity: Some(severity.into()),
            message: None,
            fix: fix.map(str::to_string),
        }
    }

    fn engine(rules: &[(&str, RuleConfig)], inline_config: bool) -> (PatternEngine, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = EngineConfig {
            rules: rules
                .iter()
                .map(|(id, r)| (id.to_string(), r.clone()))
                .collect::<BTreeMap<_, _>>(),
            inline_config,
        };
        let engine = PatternEngine::new(&config, TodoStorage::new(dir.path(), "tmplint")).unwrap();
        (engine, dir)
    }

    fn input(source: &str) -> LinterInput {
        LinterInput::new(source.into(), "app/a.hbs".into())
    }

    #[test]
    fn test_verify_reports_position_and_severity() {
        let (e, _d) = engine(
            &[
                ("no-debugger", rule(r"\{\{debugger\}\}", "error", None)),
                ("no-log", rule(r"\{\{log [^}]*\}\}", "warn", None)),
            ],
            true,
        );
        let msgs = e.verify(&input("<div>\n  {{debugger}} {{log x}}\n</div>")).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].rule, "no-debugger");
        assert_eq!((msgs[0].line, msgs[0].column), (2, 2));
        assert_eq!(msgs[0].severity, Severity::Error);
        assert_eq!(msgs[1].severity, Severity::Warning);
        assert_eq!(msgs[1].source, "{{log x}}");
        assert!(!msgs[1].is_fixable);
    }

    #[test]
    fn test_fix_rewrites_and_reverifies() {
        let (e, _d) = engine(
            &[
                ("no-trailing-spaces", rule(r"(?m)[ \t]+$", "error", Some(""))),
                ("no-debugger", rule(r"\{\{debugger\}\}", "error", None)),
            ],
            true,
        );
        let out = e.verify_and_fix(&input("<p>  \n{{debugger}}\n")).unwrap();
        assert!(out.is_fixed);
        assert_eq!(out.output, "<p>\n{{debugger}}\n");
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].rule, "no-debugger");

        let clean = e.verify_and_fix(&input("<p></p>\n")).unwrap();
        assert!(!clean.is_fixed);
        assert_eq!(clean.output, "<p></p>\n");
    }

    #[test]
    fn test_inline_disable_comments() {
        let rules = [
            ("a", rule("foo", "error", None)),
            ("b", rule("bar", "error", None)),
        ];
        let (e, _d) = engine(&rules, true);
        assert!(e.verify(&input("{{! tmplint-disable }}\nfoo bar")).unwrap().is_empty());
        let msgs = e.verify(&input("{{!-- tmplint-disable a --}}\nfoo bar")).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].rule, "b");

        let (e, _d) = engine(&rules, false);
        assert_eq!(e.verify(&input("{{! tmplint-disable }}\nfoo bar")).unwrap().len(), 2);
    }

    #[test]
    fn test_off_rules_and_invalid_rules() {
        let (e, _d) = engine(&[("a", rule("foo", "off", None))], true);
        assert!(e.verify(&input("foo")).unwrap().is_empty());

        let dir = tempdir().unwrap();
        let mut rules = BTreeMap::new();
        rules.insert("bad".to_string(), rule("(", "error", None));
        let config = EngineConfig {
            rules,
            inline_config: true,
        };
        let err = PatternEngine::new(&config, TodoStorage::new(dir.path(), "tmplint"))
            .err()
            .unwrap();
        assert!(matches!(err, LintError::InvalidRule { ref rule, .. } if rule == "bad"));
    }

    #[test]
    fn test_config_for_file_lists_active_rules() {
        let (e, _d) = engine(
            &[("a", rule("foo", "warn", None)), ("b", rule("bar", "error", None))],
            true,
        );
        let cfg = e.config_for_file(&input("{{! tmplint-disable b }}")).unwrap();
        assert_eq!(cfg["moduleId"], "app/a");
        assert_eq!(cfg["rules"]["a"]["severity"], "warning");
        assert!(cfg["rules"].get("b").is_none());
    }
}
