//! Metadata validator.
//!
//! Validates Markdown front matter and standalone YAML/JSON documents against
//! the schema of every path rule matching the file's directory, then checks
//! controlled vocabularies independently of the schema result.

use crate::context::CheckContext;
use crate::frontmatter::FrontMatter;
use crate::models::policy::MetadataSpec;
use crate::models::{Report, Violation};
use crate::schema::SchemaCache;
use crate::utils;
use rayon::prelude::*;
use serde_json::Value as Json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Markdown,
    Yaml,
    Json,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<DocumentKind> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "md" => Some(DocumentKind::Markdown),
            "yaml" | "yml" => Some(DocumentKind::Yaml),
            "json" => Some(DocumentKind::Json),
            _ => None,
        }
    }
}

/// Validate `files`. Schemas are loaded up front so the parallel phase only
/// reads the cache.
pub fn run(ctx: &CheckContext, files: &[PathBuf]) -> Report {
    let mut cache = SchemaCache::new();
    for f in files {
        for schema in schemas_for(ctx, &ctx.relative(f)) {
            cache.load(&schema);
        }
    }
    let per_file: Vec<Vec<Violation>> = files
        .par_iter()
        .map(|f| validate_file(ctx, &cache, f))
        .collect();
    let found: Vec<Violation> = per_file.into_iter().flatten().collect();
    tracing::debug!(
        files = files.len(),
        schemas = cache.len(),
        violations = found.len(),
        "metadata validation done"
    );
    ctx.report(found, files.len())
}

/// Resolved schema paths of every rule applying to `rel`, deduplicated in
/// declared order.
pub fn schemas_for(ctx: &CheckContext, rel: &str) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for rule in ctx.rules.for_file(rel) {
        if let Some(s) = rule.schema.as_deref() {
            let p = ctx.resolve(s);
            if !out.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}

/// Validate one file. Missing files and unsupported extensions are skipped.
pub fn validate_file(ctx: &CheckContext, cache: &SchemaCache, path: &Path) -> Vec<Violation> {
    let display = utils::normalize_path(&path.to_string_lossy());
    let kind = match DocumentKind::from_path(path) {
        Some(k) => k,
        None => return Vec::new(),
    };
    if !path.exists() {
        tracing::debug!(file = %path.display(), "skipping missing file");
        return Vec::new();
    }
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            return vec![Violation::error(
                "metadata/io",
                &display,
                format!("{display}: File encoding error: {e}"),
            )]
        }
    };
    let schemas = schemas_for(ctx, &ctx.relative(path));

    let data = match parse_document(kind, &content) {
        Ok(Some(data)) => data,
        Ok(None) => {
            // Markdown without front matter only matters when a schema applies.
            if schemas.is_empty() {
                return Vec::new();
            }
            return vec![Violation::error(
                "metadata/missing-front-matter",
                &display,
                format!("{display}: Missing required YAML front matter"),
            )];
        }
        Err(reason) => {
            return vec![Violation::error(
                "metadata/parse",
                &display,
                format!("{display}: {reason}"),
            )]
        }
    };

    let mut out = Vec::new();
    for schema in &schemas {
        out.extend(cache.validate(&data, schema, &display));
    }
    out.extend(check_vocabularies(&data, &ctx.policy.metadata, &display));
    out
}

/// Parse a document body into JSON. `Ok(None)` means Markdown without front
/// matter.
fn parse_document(kind: DocumentKind, content: &str) -> Result<Option<Json>, String> {
    match kind {
        DocumentKind::Markdown => match FrontMatter::extract(content) {
            Ok(Some(fm)) => fm
                .to_json()
                .map(Some)
                .map_err(|e| format!("YAML parsing error: {e}")),
            Ok(None) => Ok(None),
            Err(e) => Err(format!("YAML parsing error: {e}")),
        },
        DocumentKind::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| format!("YAML parsing error: {e}"))?;
            let value = if value.is_null() {
                serde_yaml::Value::Mapping(Default::default())
            } else {
                value
            };
            serde_json::to_value(&value)
                .map(Some)
                .map_err(|e| format!("YAML parsing error: {e}"))
        }
        DocumentKind::Json => serde_json::from_str(content)
            .map(Some)
            .map_err(|e| format!("JSON parsing error: {e}")),
    }
}

/// Check controlled vocabularies for every configured field present in `data`.
///
/// Scalars must be members of the allowed set; lists are checked item by item.
pub fn check_vocabularies(data: &Json, spec: &MetadataSpec, display: &str) -> Vec<Violation> {
    let obj = match data.as_object() {
        Some(o) => o,
        None => return Vec::new(),
    };
    let mut out = Vec::new();
    for (field, allowed) in &spec.controlled_vocabs {
        let value = match obj.get(field) {
            Some(v) => v,
            None => continue,
        };
        let reject = |v: String, how: &str| {
            Violation::error(
                "metadata/vocabulary",
                display,
                format!(
                    "{display}: Invalid value '{v}' {how} field '{field}'. Allowed values: {}",
                    allowed.join(", ")
                ),
            )
        };
        match value {
            Json::Array(items) => {
                for item in items {
                    if let Some(s) = scalar_text(item) {
                        if !allowed.contains(&s) {
                            out.push(reject(s, "in"));
                        }
                    }
                }
            }
            other => {
                if let Some(s) = scalar_text(other) {
                    if !allowed.contains(&s) {
                        out.push(reject(s, "for"));
                    }
                }
            }
        }
    }
    out
}

/// Text form of a scalar; `None` for null, arrays and objects.
fn scalar_text(v: &Json) -> Option<String> {
    match v {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::Policy;
    use serde_json::json;
    use tempfile::tempdir;

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["title", "status"],
        "properties": {
            "title": {"type": "string"},
            "status": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}}
        }
    }"#;

    const POLICY: &str = r#"
paths:
  - path: '^notes'
    schema: schemas/note.json
metadata:
  controlled_vocabs:
    status: [draft, published]
    tags: [ai, research]
"#;

    fn setup() -> (tempfile::TempDir, CheckContext) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("schemas")).unwrap();
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::write(root.join("schemas/note.json"), SCHEMA).unwrap();
        let ctx = CheckContext::new(Policy::from_yaml(POLICY).unwrap(), root);
        (dir, ctx)
    }

    #[test]
    fn test_valid_front_matter_passes() {
        let (dir, ctx) = setup();
        let f = dir.path().join("notes/a.md");
        fs::write(&f, "---\ntitle: A\nstatus: draft\ntags: [ai]\n---\n# A\n").unwrap();
        let report = run(&ctx, &[f]);
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_missing_required_field_reports_once() {
        let (dir, ctx) = setup();
        let f = dir.path().join("notes/a.md");
        fs::write(&f, "---\nstatus: draft\n---\n").unwrap();
        let report = run(&ctx, &[f]);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].check, "metadata/schema");
        assert!(report.violations[0].message.contains("title"));
    }

    #[test]
    fn test_vocabulary_independent_of_schema() {
        let (dir, ctx) = setup();
        let f = dir.path().join("notes/a.md");
        // status is a string (schema ok) but outside the vocabulary
        fs::write(&f, "---\ntitle: A\nstatus: finished\ntags: [ai, cooking]\n---\n").unwrap();
        let report = run(&ctx, &[f]);
        let checks: Vec<&str> = report.violations.iter().map(|v| v.check.as_str()).collect();
        assert_eq!(checks, vec!["metadata/vocabulary", "metadata/vocabulary"]);
        assert!(report.violations[0]
            .message
            .contains("Invalid value 'finished' for field 'status'. Allowed values: draft, published"));
        assert!(report.violations[1]
            .message
            .contains("Invalid value 'cooking' in field 'tags'"));
    }

    #[test]
    fn test_markdown_without_front_matter() {
        let (dir, ctx) = setup();
        let governed = dir.path().join("notes/plain.md");
        let free = dir.path().join("plain.md");
        fs::write(&governed, "# just text\n").unwrap();
        fs::write(&free, "# just text\n").unwrap();
        let cache = SchemaCache::new();
        let v = validate_file(&ctx, &cache, &governed);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].check, "metadata/missing-front-matter");
        assert!(validate_file(&ctx, &cache, &free).is_empty());
    }

    #[test]
    fn test_parse_errors_are_per_file() {
        let (dir, ctx) = setup();
        let bad_md = dir.path().join("notes/bad.md");
        let bad_json = dir.path().join("data.json");
        let bad_yaml = dir.path().join("data.yaml");
        let good = dir.path().join("notes/good.md");
        fs::write(&bad_md, "---\ntitle: x\n").unwrap();
        fs::write(&bad_json, "{ nope").unwrap();
        fs::write(&bad_yaml, "a: [b\n").unwrap();
        fs::write(&good, "---\ntitle: G\nstatus: published\n---\n").unwrap();
        let report = run(&ctx, &[bad_md, bad_json, bad_yaml, good]);
        assert_eq!(report.violations.len(), 3);
        assert!(report.violations.iter().all(|v| v.check == "metadata/parse"));
        assert!(report.violations[1].message.contains("JSON parsing error"));
    }

    #[test]
    fn test_standalone_yaml_and_json_checked_against_vocab() {
        let (dir, ctx) = setup();
        let y = dir.path().join("meta.yml");
        let j = dir.path().join("notes/meta.json");
        fs::write(&y, "status: retired\n").unwrap();
        fs::write(&j, r#"{"title": "J", "status": "draft"}"#).unwrap();
        let report = run(&ctx, &[y, j]);
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].message.contains("'retired'"));
    }

    #[test]
    fn test_missing_schema_reported_for_each_dependent_file() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("notes")).unwrap();
        let policy = Policy::from_yaml("paths:\n  - path: notes\n    schema: nowhere.json\n").unwrap();
        let ctx = CheckContext::new(policy, root);
        let a = root.join("notes/a.md");
        let b = root.join("notes/b.md");
        let c = root.join("c.md");
        for f in [&a, &b, &c] {
            fs::write(f, "---\ntitle: x\n---\n").unwrap();
        }
        let report = run(&ctx, &[a, b, c]);
        assert_eq!(report.violations.len(), 2);
        assert!(report
            .violations
            .iter()
            .all(|v| v.check == "metadata/schema-load"));
    }

    #[test]
    fn test_unsupported_and_missing_files_skipped() {
        let (dir, ctx) = setup();
        let report = run(
            &ctx,
            &[dir.path().join("notes/gone.md"), dir.path().join("x.txt")],
        );
        assert!(report.is_clean());
    }

    #[test]
    fn test_check_vocabularies_scalars() {
        let spec = MetadataSpec {
            controlled_vocabs: [("level".to_string(), vec!["1".to_string(), "2".to_string()])]
                .into_iter()
                .collect(),
            default_author: None,
        };
        assert!(check_vocabularies(&json!({"level": 1}), &spec, "f").is_empty());
        assert_eq!(check_vocabularies(&json!({"level": 3}), &spec, "f").len(), 1);
        assert!(check_vocabularies(&json!({"level": null}), &spec, "f").is_empty());
        assert!(check_vocabularies(&json!({"other": "x"}), &spec, "f").is_empty());
        assert!(check_vocabularies(&json!(["level"]), &spec, "f").is_empty());
    }
}
