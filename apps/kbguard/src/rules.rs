//! Path rule matching.
//!
//! Rules are compiled once per run. A rule applies to an entry when its
//! `path` pattern is found anywhere in the entry's parent directory string
//! (repo-relative, `/`-separated). Every applicable rule is enforced. A rule
//! whose `path` or `filename` pattern fails to compile is reported once and
//! never matches.

use crate::error::KbError;
use crate::models::policy::PathRule;
use crate::models::Violation;
use regex::Regex;

/// A policy rule with its patterns compiled.
#[derive(Debug)]
pub struct CompiledRule {
    /// The `path` pattern as written in the policy, used in messages.
    pub source: String,
    pub path: Regex,
    /// Anchored at the start.
    pub filename: Option<Regex>,
    pub schema: Option<String>,
    pub required_files: Vec<String>,
    pub description: String,
}

impl CompiledRule {
    pub fn applies_to_dir(&self, dir: &str) -> bool {
        self.path.is_match(dir)
    }

    /// `true` when the rule has no filename pattern.
    pub fn accepts_filename(&self, name: &str) -> bool {
        self.filename.as_ref().map_or(true, |re| re.is_match(name))
    }
}

#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile `rules` in declared order. Returns the usable rules plus one
    /// `policy/invalid-regex` violation per rule that had to be dropped.
    pub fn compile(rules: &[PathRule]) -> (RuleSet, Vec<Violation>) {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut violations = Vec::new();
        for rule in rules {
            match compile_rule(rule) {
                Ok(c) => compiled.push(c),
                Err(e) => {
                    tracing::warn!(rule = %rule.path, error = %e, "skipping policy rule");
                    violations.push(Violation::error(
                        "policy/invalid-regex",
                        rule.path.clone(),
                        e.to_string(),
                    ));
                }
            }
        }
        (RuleSet { rules: compiled }, violations)
    }

    /// Rules whose `path` pattern is found in `dir`, in declared order.
    pub fn matching<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.rules.iter().filter(move |r| r.applies_to_dir(dir))
    }

    /// Rules applying to a file, matched on its parent directory.
    pub fn for_file<'a>(&'a self, rel_file: &'a str) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.matching(parent_dir(rel_file))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(rule: &PathRule) -> Result<CompiledRule, KbError> {
    let invalid = |source| KbError::InvalidRule {
        pattern: rule.path.clone(),
        source,
    };
    let path = Regex::new(&rule.path).map_err(invalid)?;
    let filename = match rule.filename.as_deref() {
        Some(p) => Some(compile_anchored(p).map_err(invalid)?),
        None => None,
    };
    Ok(CompiledRule {
        source: rule.path.clone(),
        path,
        filename,
        schema: rule.schema.clone(),
        required_files: rule.required_files.clone(),
        description: rule.description.clone(),
    })
}

/// Compile `pattern` so it must match at the start of the input.
pub fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Parent directory of a `/`-separated relative path; `.` for bare names.
pub fn parent_dir(rel: &str) -> &str {
    match rel.rfind('/') {
        Some(0) => "/",
        Some(i) => &rel[..i],
        None => ".",
    }
}
