//! Immutable per-run validation context.
//!
//! Bundles the loaded policy with its compiled rules and naming engine so
//! every checker receives the same configuration explicitly. Policy-level
//! problems found while compiling (invalid patterns) are kept here and
//! prepended to each report.

use crate::models::policy::{EnforcementLevel, Policy};
use crate::models::{Report, Violation};
use crate::naming::NamingEngine;
use crate::rules::RuleSet;
use crate::utils;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct CheckContext {
    pub policy: Policy,
    pub root: PathBuf,
    pub rules: RuleSet,
    pub naming: NamingEngine,
    pub skip_dirs: Vec<String>,
    policy_violations: Vec<Violation>,
}

impl CheckContext {
    pub fn new(policy: Policy, root: impl Into<PathBuf>) -> Self {
        let (rules, mut policy_violations) = RuleSet::compile(&policy.paths);
        let (naming, naming_violations) = NamingEngine::new(&policy.naming);
        policy_violations.extend(naming_violations);
        tracing::debug!(
            rules = rules.len(),
            invalid = policy_violations.len(),
            "policy compiled"
        );
        CheckContext {
            policy,
            root: root.into(),
            rules,
            naming,
            skip_dirs: Vec::new(),
            policy_violations,
        }
    }

    /// Extra directory names to skip in addition to the built-in cache dirs.
    pub fn with_skip_dirs(mut self, skip_dirs: Vec<String>) -> Self {
        self.skip_dirs = skip_dirs;
        self
    }

    pub fn policy_violations(&self) -> &[Violation] {
        &self.policy_violations
    }

    pub fn level(&self) -> EnforcementLevel {
        self.policy.enforcement.level
    }

    /// Repo-relative, `/`-separated form of `path` used for rule matching.
    pub fn relative(&self, path: &Path) -> String {
        utils::repo_relative(path, &self.root)
    }

    /// Resolve a policy-relative reference (e.g. a schema path) against the root.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let p = Path::new(reference);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Build the final report: policy-level violations first, then `found`.
    pub fn report(&self, found: Vec<Violation>, files: usize) -> Report {
        let mut all = self.policy_violations.clone();
        all.extend(found);
        Report::new(all, files, self.level())
    }
}
