//! Shared data models: policy schema plus the violation/report structs
//! consumed by the printers.

pub mod policy;

use policy::EnforcementLevel;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Prefix used in human output.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "ERROR:",
            Severity::Warning => "WARNING:",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single policy violation.
pub struct Violation {
    pub path: String,
    pub check: String,
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    pub fn error(check: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            check: check.to_string(),
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(check: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(check, path, message)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Aggregated counts used by printers and the exit code.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
/// Result of one checker run.
pub struct Report {
    pub violations: Vec<Violation>,
    pub summary: Summary,
}

impl Report {
    /// Build a report, downgrading every violation under `warning` enforcement.
    pub fn new(mut violations: Vec<Violation>, files: usize, level: EnforcementLevel) -> Self {
        if level == EnforcementLevel::Warning {
            for v in violations.iter_mut() {
                v.severity = Severity::Warning;
            }
        }
        let errors = violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count();
        let warnings = violations.len() - errors;
        Report {
            violations,
            summary: Summary {
                errors,
                warnings,
                files,
            },
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// 0 when no error-severity violation remains, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.summary.errors > 0 {
            1
        } else {
            0
        }
    }
}
