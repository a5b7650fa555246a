//! Error types for policy loading and per-file validation.
//!
//! Only the configuration variants are fatal. Everything else is turned into a
//! [`Violation`](crate::models::Violation) by the checker that hit it so one
//! bad file never blocks the rest of the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or validating files.
#[derive(Error, Debug)]
pub enum KbError {
    /// Policy file does not exist.
    #[error("Policy file not found: {}", .0.display())]
    PolicyNotFound(PathBuf),

    /// Policy file exists but is not a valid policy document.
    #[error("Error parsing policy file {}: {source}", .path.display())]
    PolicyParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `kbguard.toml|yaml|yml` could not be read or parsed.
    #[error("Invalid configuration {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    /// A referenced JSON Schema is missing or invalid.
    #[error("Could not load schema {}: {reason}", .path.display())]
    SchemaLoad { path: PathBuf, reason: String },

    /// A document body failed to parse.
    #[error("{kind} parsing error: {reason}")]
    Parse { kind: &'static str, reason: String },

    /// A policy rule carries a pattern that does not compile.
    #[error("Invalid regex in policy for path '{pattern}': {source}")]
    InvalidRule {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Low-level I/O failure on a specific path.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KbError {
    /// True for errors that must abort the run before any check executes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KbError::PolicyNotFound(_) | KbError::PolicyParse { .. } | KbError::Config { .. }
        )
    }
}
