//! Naming rule engine.
//!
//! Allowed characters are evaluated in two stages: the configured
//! `allowed_chars` pattern (anchored at the start) and, only if that fails,
//! the portable fallback `^[a-zA-Z0-9._-]+$`. A name is flagged when both
//! stages reject it. If the configured pattern does not compile, it is
//! reported as a policy violation and only the fallback stage runs.

use crate::models::policy::{CaseConvention, NamingSpec};
use crate::models::Violation;
use crate::rules::compile_anchored;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static FALLBACK_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("fallback pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    fn noun(self) -> &'static str {
        match self {
            EntryKind::File => "filename",
            EntryKind::Directory => "directory name",
        }
    }
}

#[derive(Debug)]
pub struct NamingEngine {
    forbid_spaces: bool,
    allowed: Option<Regex>,
    pattern_rejected: bool,
    case: CaseConvention,
}

impl NamingEngine {
    /// Build the engine; an invalid `allowed_chars` yields one policy violation.
    pub fn new(spec: &NamingSpec) -> (NamingEngine, Vec<Violation>) {
        let mut violations = Vec::new();
        let mut pattern_rejected = false;
        let allowed = match spec.allowed_chars.as_deref() {
            Some(p) => match compile_anchored(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "naming.allowed_chars does not compile");
                    violations.push(Violation::error(
                        "policy/invalid-regex",
                        "naming.allowed_chars",
                        format!("Invalid regex in policy for naming.allowed_chars '{p}': {e}"),
                    ));
                    pattern_rejected = true;
                    None
                }
            },
            None => None,
        };
        (
            NamingEngine {
                forbid_spaces: spec.forbid_spaces,
                allowed,
                pattern_rejected,
                case: spec.case,
            },
            violations,
        )
    }

    /// Full filename check: spaces, allowed characters and case convention.
    pub fn check(&self, filename: &str, display: &str) -> Vec<Violation> {
        let mut out = self.check_name(filename, display, EntryKind::File);
        if let Some(v) = self.case_violation(filename, display) {
            out.push(v);
        }
        out
    }

    /// Spaces and allowed-character stages only.
    pub fn check_name(&self, name: &str, display: &str, kind: EntryKind) -> Vec<Violation> {
        let mut out = Vec::new();
        if self.forbid_spaces && name.contains(' ') {
            out.push(Violation::error(
                "naming/spaces",
                display,
                format!("Spaces not allowed in {}: {display}", kind.noun()),
            ));
        }
        if !self.allows_chars(name) {
            out.push(Violation::error(
                "naming/invalid-chars",
                display,
                format!("Invalid characters in {}: {display}", kind.noun()),
            ));
        }
        out
    }

    /// Two-stage allowed-characters evaluation. Without a configured pattern
    /// every name passes.
    pub fn allows_chars(&self, name: &str) -> bool {
        match &self.allowed {
            Some(re) => re.is_match(name) || FALLBACK_CHARS.is_match(name),
            None if self.pattern_rejected => FALLBACK_CHARS.is_match(name),
            None => true,
        }
    }

    fn case_violation(&self, filename: &str, display: &str) -> Option<Violation> {
        let stem = file_stem(filename);
        match self.case {
            CaseConvention::Kebab => (stem.contains('_') && !is_all_lowercase(stem)).then(|| {
                Violation::error(
                    "naming/case",
                    display,
                    format!("Filename should use kebab-case: {display}"),
                )
            }),
            CaseConvention::Snake => stem.contains('-').then(|| {
                Violation::error(
                    "naming/case",
                    display,
                    format!("Filename should use snake_case: {display}"),
                )
            }),
        }
    }
}

/// At least one lowercase letter and no uppercase one. Stems without any
/// cased letter (`2024_01`) do not qualify.
fn is_all_lowercase(stem: &str) -> bool {
    stem.chars().any(char::is_lowercase) && !stem.chars().any(char::is_uppercase)
}

/// Filename without its final extension; dot-files keep their full name.
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}
