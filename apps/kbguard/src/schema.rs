//! JSON Schema loading, caching and validation.
//!
//! Schemas are compiled once per resolved path and reused for every file of
//! the run. Load failures are cached too, so each dependent file reports the
//! same `metadata/schema-load` violation without re-reading the schema.

use crate::error::KbError;
use crate::models::Violation;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct SchemaCache {
    entries: HashMap<PathBuf, Result<JSONSchema, String>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the schema at `path` unless it is already cached.
    pub fn load(&mut self, path: &Path) {
        if self.entries.contains_key(path) {
            return;
        }
        let compiled = compile_schema(path).map_err(|e| e.to_string());
        if let Err(reason) = &compiled {
            tracing::warn!(schema = %path.display(), %reason, "schema unavailable");
        } else {
            tracing::debug!(schema = %path.display(), "schema compiled");
        }
        self.entries.insert(path.to_path_buf(), compiled);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate `data` against the cached schema at `schema_path`.
    ///
    /// Violations are sorted by instance path, then message.
    pub fn validate(&self, data: &Json, schema_path: &Path, display: &str) -> Vec<Violation> {
        let compiled = match self.entries.get(schema_path) {
            Some(Ok(c)) => c,
            Some(Err(reason)) => {
                return vec![Violation::error(
                    "metadata/schema-load",
                    display,
                    format!("{display}: {reason}"),
                )]
            }
            None => {
                return vec![Violation::error(
                    "metadata/schema-load",
                    display,
                    format!(
                        "{display}: Could not load schema {}: not loaded",
                        schema_path.display()
                    ),
                )]
            }
        };
        let mut found: Vec<(Vec<String>, String)> = match compiled.validate(data) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| (pointer_segments(&e.instance_path.to_string()), e.to_string()))
                .collect(),
        };
        found.sort();
        found
            .into_iter()
            .map(|(segments, message)| {
                Violation::error(
                    "metadata/schema",
                    display,
                    format!("{display}: {message} at {}", format_location(&segments)),
                )
            })
            .collect()
    }
}

fn compile_schema(path: &Path) -> Result<JSONSchema, KbError> {
    let load_err = |reason: String| KbError::SchemaLoad {
        path: path.to_path_buf(),
        reason,
    };
    let raw = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    let doc: Json = serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))?;
    let mut options = JSONSchema::options();
    // an explicit `$schema` picks its own draft
    if doc.get("$schema").is_none() {
        options.with_draft(Draft::Draft202012);
    }
    options.compile(&doc).map_err(|e| load_err(e.to_string()))
}

/// Split a JSON pointer (`/a/0/b`) into unescaped segments.
fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// `a -> 0 -> b`, or `root` for the document itself.
pub fn format_location(segments: &[String]) -> String {
    if segments.is_empty() {
        "root".to_string()
    } else {
        segments.join(" -> ")
    }
}
