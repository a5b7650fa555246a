//! Policy schema loaded from `.kb/policy/kb-policy.yaml`.
//!
//! Key components:
//! - `naming`: global filename rules (spaces, allowed characters, case).
//! - `paths`: ordered directory rules with filename patterns, schemas and
//!   required files.
//! - `files`: extension categories and size limits.
//! - `metadata`: controlled vocabularies for front-matter fields.
//! - `require`: root-relative paths that must exist.
//! - `enforcement`: whether violations fail the run.

use crate::error::KbError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default location of the policy relative to the repository root.
pub const DEFAULT_POLICY_PATH: &str = ".kb/policy/kb-policy.yaml";

#[derive(Debug, Default, Deserialize, Clone)]
/// Root policy document.
pub struct Policy {
    #[serde(default)]
    pub naming: NamingSpec,
    #[serde(default)]
    pub paths: Vec<PathRule>,
    #[serde(default)]
    pub files: FilesSpec,
    #[serde(default)]
    pub metadata: MetadataSpec,
    #[serde(default)]
    pub require: Vec<RequiredPath>,
    #[serde(default)]
    pub enforcement: EnforcementSpec,
}

#[derive(Debug, Deserialize, Clone)]
/// Global naming conventions.
pub struct NamingSpec {
    #[serde(default = "default_true")]
    pub forbid_spaces: bool,
    #[serde(default)]
    pub allowed_chars: Option<String>,
    #[serde(default)]
    pub case: CaseConvention,
}

impl Default for NamingSpec {
    fn default() -> Self {
        Self {
            forbid_spaces: true,
            allowed_chars: None,
            case: CaseConvention::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Case convention applied to filename stems.
pub enum CaseConvention {
    #[default]
    Kebab,
    Snake,
}

#[derive(Debug, Deserialize, Clone)]
/// Directory-scoped rule. `path` is searched in the parent directory string.
pub struct PathRule {
    pub path: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub required_files: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Clone)]
/// File-level limits.
pub struct FilesSpec {
    /// Category name -> extensions (with or without leading dot).
    #[serde(default)]
    pub allowed_extensions: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: f64,
    /// Markdown files with less body text are reported as warnings.
    #[serde(default)]
    pub min_content_chars: Option<usize>,
}

impl Default for FilesSpec {
    fn default() -> Self {
        Self {
            allowed_extensions: BTreeMap::new(),
            max_file_size_mb: default_max_file_size_mb(),
            min_content_chars: None,
        }
    }
}

impl FilesSpec {
    /// Whether `ext` (lowercase, with leading dot) is listed in any category.
    pub fn lists_extension(&self, ext: &str) -> bool {
        self.allowed_extensions.values().flatten().any(|listed| {
            let listed = listed.trim().to_ascii_lowercase();
            listed == ext || format!(".{listed}") == ext
        })
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Metadata rules shared by the validator and the front-matter enforcer.
pub struct MetadataSpec {
    #[serde(default)]
    pub controlled_vocabs: BTreeMap<String, Vec<String>>,
    /// Author recorded when the enforcer generates academic front matter.
    #[serde(default)]
    pub default_author: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
/// A `require` entry: either a bare path or `{ path, description }`.
pub enum RequiredPath {
    Path(String),
    Entry {
        path: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl RequiredPath {
    pub fn path(&self) -> &str {
        match self {
            RequiredPath::Path(p) => p,
            RequiredPath::Entry { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct EnforcementSpec {
    #[serde(default)]
    pub level: EnforcementLevel,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// `error` fails the run on any violation; `warning` only reports.
pub enum EnforcementLevel {
    #[default]
    Error,
    Warning,
}

fn default_true() -> bool {
    true
}

fn default_max_file_size_mb() -> f64 {
    50.0
}

impl Policy {
    /// Load and parse a policy file. Both failure modes are fatal.
    pub fn load(path: &Path) -> Result<Policy, KbError> {
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KbError::PolicyNotFound(path.to_path_buf()),
            _ => KbError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Self::from_yaml(&raw).map_err(|source| KbError::PolicyParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Policy, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}
