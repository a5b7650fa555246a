//! Front-matter enforcer.
//!
//! Classifies Markdown documents into a content type, reports missing or
//! invalid front-matter fields for that type and, in fix mode, generates the
//! missing fields from the document itself. Existing values are never
//! overwritten except `updated`, which is bumped on every rewrite.

use crate::context::CheckContext;
use crate::error::KbError;
use crate::frontmatter::{FrontMatter, FrontMatterError};
use crate::models::{Report, Violation};
use crate::utils;
use chrono::NaiveDate;
use regex::Regex;
use serde_yaml::{Mapping, Value as Yaml};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_TAGS: usize = 10;
const GENERATED_TAGS: usize = 5;
const MAX_DESCRIPTION: usize = 200;
const SCAN_SKIP: &[&str] = &[".git", "node_modules", ".vscode", "cache"];

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("heading pattern compiles"));
static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)version[:\s]+([0-9]+\.[0-9]+\.[0-9]+)").expect("version pattern compiles")
});
static CITATIONS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"(?i)\[([^\]]+)\]\([^)]*(?:doi|arxiv|journal)[^)]*\)",
        r"(?i)doi:\s*(\S+)",
        r"(?i)arxiv:\s*(\S+)",
    ]
    .map(|p| Regex::new(p).expect("citation pattern compiles"))
});

const TAG_INDICATORS: &[(&str, &[&str])] = &[
    ("ai", &["artificial intelligence", "machine learning", "ai", "ml"]),
    ("research", &["research", "study", "analysis", "methodology"]),
    ("tools", &["tool", "software", "application", "utility"]),
    ("documentation", &["guide", "manual", "reference", "documentation"]),
    ("academic", &["academic", "scholarly", "peer-reviewed", "journal"]),
    ("technical", &["technical", "api", "programming", "development"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Basic,
    Academic,
    Technical,
    Project,
}

impl ContentType {
    pub fn required_fields(self) -> &'static [&'static str] {
        const BASIC: &[&str] = &["title", "description", "status", "created", "updated", "tags"];
        match self {
            ContentType::Basic => BASIC,
            ContentType::Academic => &[
                "title", "description", "status", "created", "updated", "tags", "authors",
                "citations",
            ],
            ContentType::Technical => &[
                "title", "description", "status", "created", "updated", "tags", "version",
            ],
            ContentType::Project => &[
                "title", "description", "status", "created", "updated", "tags", "project_type",
                "methodology",
            ],
        }
    }

    /// Path keywords win over content indicators.
    pub fn detect(rel_path: &str, body: &str) -> ContentType {
        let path = rel_path.to_lowercase();
        let in_path = |words: &[&str]| words.iter().any(|w| path.contains(w));
        if in_path(&["research", "literature", "citation", "academic"]) {
            return ContentType::Academic;
        }
        if in_path(&["tools", "reference", "api", "technical"]) {
            return ContentType::Technical;
        }
        if in_path(&["projects", "workflow", "methodology"]) {
            return ContentType::Project;
        }
        let text = body.to_lowercase();
        let in_text = |words: &[&str]| words.iter().any(|w| text.contains(w));
        if in_text(&["citation", "doi:", "arxiv:", "journal:", "peer review", "methodology"]) {
            ContentType::Academic
        } else if in_text(&["api", "function", "parameter", "usage example", "tool name"]) {
            ContentType::Technical
        } else if in_text(&["phase", "milestone", "workflow", "completion", "implementation"]) {
            ContentType::Project
        } else {
            ContentType::Basic
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixMode {
    /// Report only.
    Check,
    /// Rewrite files.
    Fix,
    /// Compute fixes without writing.
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixAction {
    pub file: String,
    /// `Added` when the document had no front matter, `Fixed` otherwise.
    pub action: &'static str,
    pub wrote: bool,
}

pub struct Enforcer<'a> {
    ctx: &'a CheckContext,
    today: NaiveDate,
    vocabs: BTreeMap<String, Vec<String>>,
}

impl<'a> Enforcer<'a> {
    /// Built-in vocabularies are overridden field by field by the policy.
    pub fn new(ctx: &'a CheckContext, today: NaiveDate) -> Self {
        let mut vocabs: BTreeMap<String, Vec<String>> = [
            ("status", &["draft", "in-review", "published", "deprecated", "archived"][..]),
            ("confidence_level", &["high", "medium", "low"][..]),
            ("project_status", &["active", "completed", "on-hold", "archived"][..]),
        ]
        .into_iter()
        .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
        .collect();
        for (field, allowed) in &ctx.policy.metadata.controlled_vocabs {
            vocabs.insert(field.clone(), allowed.clone());
        }
        Enforcer { ctx, today, vocabs }
    }

    /// Markdown files under `base`, sorted, skipping tool and cache directories.
    pub fn scan(&self, base: &Path) -> Vec<PathBuf> {
        WalkDir::new(base)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !(SCAN_SKIP.contains(&name.as_ref())
                        || utils::is_skipped_dir_name(&name, &self.ctx.skip_dirs))
            })
            .flatten()
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|x| x == "md"))
            .map(|e| e.into_path())
            .collect()
    }

    /// Problems with existing front matter for the given content type.
    pub fn validate(&self, fm: &FrontMatter, kind: ContentType) -> Vec<String> {
        let mut problems: Vec<String> = kind
            .required_fields()
            .iter()
            .filter(|f| !fm.contains(f))
            .map(|f| format!("Missing required field: {f}"))
            .collect();

        for (field, allowed) in &self.vocabs {
            let Some(value) = fm.get(field) else { continue };
            let values: Vec<&Yaml> = match value {
                Yaml::Sequence(items) => items.iter().collect(),
                other => vec![other],
            };
            for v in values {
                if let Some(text) = yaml_text(v) {
                    if !allowed.contains(&text) {
                        problems.push(format!(
                            "Invalid value for {field}: {text}. Valid values: {}",
                            allowed.join(", ")
                        ));
                    }
                }
            }
        }

        for field in ["created", "updated"] {
            if let Some(v) = fm.get(field) {
                let text = yaml_text(v).unwrap_or_default();
                if NaiveDate::parse_from_str(&text, DATE_FORMAT).is_err() {
                    problems.push(format!(
                        "Invalid date format for {field}: {text}. Expected: YYYY-MM-DD"
                    ));
                }
            }
        }

        match fm.get("tags") {
            Some(Yaml::Sequence(tags)) if tags.len() > MAX_TAGS => {
                problems.push(format!("Too many tags (max {MAX_TAGS})"))
            }
            Some(Yaml::Sequence(_)) | None => {}
            Some(_) => problems.push("Tags must be a list".to_string()),
        }
        problems
    }

    /// Generate a full field set for a document from its path and body.
    pub fn generate(&self, rel_path: &str, body: &str, kind: ContentType) -> Mapping {
        let mut m = Mapping::new();
        let title = HEADING
            .captures(body)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| title_from_filename(rel_path));
        let description =
            first_paragraph(body).unwrap_or_else(|| format!("Documentation for {title}"));
        let lower = body.to_lowercase();
        let status = if ["work in progress", "draft", "todo"]
            .iter()
            .any(|w| lower.contains(w))
        {
            "draft"
        } else if ["complete", "final", "published"].iter().any(|w| lower.contains(w)) {
            "published"
        } else {
            "draft"
        };
        let today = self.today.format(DATE_FORMAT).to_string();

        insert(&mut m, "title", title.into());
        insert(&mut m, "description", description.into());
        insert(&mut m, "status", status.into());
        insert(&mut m, "created", today.clone().into());
        insert(&mut m, "updated", today.into());
        insert(&mut m, "tags", string_seq(generate_tags(rel_path, &lower)));

        match kind {
            ContentType::Academic => {
                let authors: Vec<String> =
                    self.ctx.policy.metadata.default_author.iter().cloned().collect();
                insert(&mut m, "authors", string_seq(authors));
                insert(&mut m, "citations", string_seq(extract_citations(body)));
                insert(&mut m, "confidence_level", "medium".into());
            }
            ContentType::Technical => {
                let version = VERSION
                    .captures(body)
                    .map(|c| c[1].to_string())
                    .unwrap_or_else(|| "1.0.0".to_string());
                insert(&mut m, "version", version.into());
            }
            ContentType::Project => {
                let project_type = if lower.contains("implementation") {
                    "implementation"
                } else if lower.contains("analysis") {
                    "analysis"
                } else if lower.contains("completion") {
                    "completion-report"
                } else {
                    "research"
                };
                insert(&mut m, "project_type", project_type.into());
                insert(&mut m, "methodology", "systematic-content-recreation".into());
            }
            ContentType::Basic => {}
        }
        m
    }

    /// Compute the rewritten document, or `None` when nothing needs fixing.
    pub fn plan_fix(
        &self,
        rel_path: &str,
        content: &str,
    ) -> Result<Option<(&'static str, String)>, FrontMatterError> {
        let (fm, action) = match FrontMatter::extract(content)? {
            None => {
                let kind = ContentType::detect(rel_path, content);
                let fields = self.generate(rel_path, content, kind);
                let body = format!("\n{content}");
                (FrontMatter { fields, body }, "Added")
            }
            Some(mut fm) => {
                let kind = ContentType::detect(rel_path, &fm.body);
                let missing: Vec<&str> = kind
                    .required_fields()
                    .iter()
                    .copied()
                    .filter(|f| !fm.contains(f))
                    .collect();
                if missing.is_empty() {
                    return Ok(None);
                }
                let generated = self.generate(rel_path, &fm.body, kind);
                for field in missing {
                    if let Some(v) = generated.get(field) {
                        fm.fields.insert(field.into(), v.clone());
                    }
                }
                fm.fields.insert(
                    "updated".into(),
                    self.today.format(DATE_FORMAT).to_string().into(),
                );
                (fm, "Fixed")
            }
        };
        Ok(Some((action, fm.render()?)))
    }

    /// Inspect or fix `files`. Parse failures are reported and never rewritten.
    pub fn run(&self, files: &[PathBuf], mode: FixMode) -> (Report, Vec<FixAction>) {
        let mut found = Vec::new();
        let mut actions = Vec::new();
        for path in files {
            let display = utils::normalize_path(&path.to_string_lossy());
            let outcome = match mode {
                FixMode::Check => fs::read_to_string(path)
                    .map(|content| found.extend(self.inspect(path, &content)))
                    .map_err(|source| KbError::Io {
                        path: path.to_path_buf(),
                        source,
                    }),
                FixMode::Fix | FixMode::DryRun => self
                    .fix(path, mode == FixMode::Fix)
                    .map(|action| actions.extend(action)),
            };
            if let Err(e) = outcome {
                found.push(Violation::error(
                    "frontmatter/fix",
                    &display,
                    format!("{display}: {e}"),
                ));
            }
        }
        (self.ctx.report(found, files.len()), actions)
    }

    /// Report front-matter problems of one document.
    pub fn inspect(&self, path: &Path, content: &str) -> Vec<Violation> {
        let display = utils::normalize_path(&path.to_string_lossy());
        match FrontMatter::extract(content) {
            Ok(None) => vec![Violation::error(
                "frontmatter/missing",
                &display,
                format!("{display}: Missing frontmatter"),
            )],
            Ok(Some(fm)) => {
                let kind = ContentType::detect(&self.ctx.relative(path), &fm.body);
                self.validate(&fm, kind)
                    .into_iter()
                    .map(|p| {
                        Violation::error("frontmatter/invalid", &display, format!("{display}: {p}"))
                    })
                    .collect()
            }
            Err(e) => vec![Violation::error(
                "frontmatter/parse",
                &display,
                format!("{display}: Invalid YAML frontmatter: {e}"),
            )],
        }
    }

    /// Fix one document, writing it only when `write` is set.
    pub fn fix(&self, path: &Path, write: bool) -> Result<Option<FixAction>, KbError> {
        let content = fs::read_to_string(path).map_err(|source| KbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let planned = self
            .plan_fix(&self.ctx.relative(path), &content)
            .map_err(|e| KbError::Parse {
                kind: "Front matter",
                reason: e.to_string(),
            })?;
        let Some((action, rendered)) = planned else {
            return Ok(None);
        };
        if write {
            fs::write(path, rendered).map_err(|source| KbError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(file = %path.display(), action, "front matter written");
        }
        Ok(Some(FixAction {
            file: utils::normalize_path(&path.to_string_lossy()),
            action,
            wrote: write,
        }))
    }
}

fn insert(m: &mut Mapping, key: &str, value: Yaml) {
    m.insert(Yaml::String(key.to_string()), value);
}

fn string_seq(items: Vec<String>) -> Yaml {
    Yaml::Sequence(items.into_iter().map(Yaml::String).collect())
}

fn yaml_text(v: &Yaml) -> Option<String> {
    match v {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn title_from_filename(rel_path: &str) -> String {
    crate::naming::file_stem(rel_path.rsplit('/').next().unwrap_or(rel_path))
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// First non-heading paragraph, whitespace-collapsed and truncated.
fn first_paragraph(body: &str) -> Option<String> {
    let para = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#') && !p.starts_with("---"))?;
    let collapsed = para.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_DESCRIPTION {
        let cut: String = collapsed.chars().take(MAX_DESCRIPTION - 3).collect();
        Some(format!("{cut}..."))
    } else {
        Some(collapsed)
    }
}

fn generate_tags(rel_path: &str, lower_body: &str) -> Vec<String> {
    let mut tags: BTreeSet<String> = BTreeSet::new();
    let dirs = rel_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    for part in dirs.split('/') {
        if !part.is_empty() && ![".", "..", "docs"].contains(&part) {
            tags.insert(part.replace(['-', '_'], " "));
        }
    }
    let words: BTreeSet<&str> = lower_body
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    for (tag, indicators) in TAG_INDICATORS {
        let hit = indicators.iter().any(|i| {
            if i.contains(' ') {
                lower_body.contains(i)
            } else {
                words.contains(i)
            }
        });
        if hit {
            tags.insert(tag.to_string());
        }
    }
    tags.into_iter().take(GENERATED_TAGS).collect()
}

fn extract_citations(body: &str) -> Vec<String> {
    CITATIONS
        .iter()
        .flat_map(|re| re.captures_iter(body).map(|c| c[1].to_string()))
        .take(10)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::Policy;
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn ctx(root: &Path) -> CheckContext {
        CheckContext::new(Policy::from_yaml("{}\n").unwrap(), root)
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::detect("research/x.md", ""), ContentType::Academic);
        assert_eq!(ContentType::detect("tools/x.md", ""), ContentType::Technical);
        assert_eq!(ContentType::detect("projects/x.md", ""), ContentType::Project);
        assert_eq!(ContentType::detect("x.md", "see doi: 10.1/abc"), ContentType::Academic);
        assert_eq!(ContentType::detect("x.md", "next milestone"), ContentType::Project);
        assert_eq!(ContentType::detect("x.md", "plain"), ContentType::Basic);
    }

    #[test]
    fn test_generate_basic_fields() {
        let dir = tempdir().unwrap();
        let c = ctx(dir.path());
        let e = Enforcer::new(&c, today());
        let body = "# Reading Habits\n\nNotes on how I read books.\nSecond line.\n\nMore.\n";
        let m = e.generate("notes/reading-habits.md", body, ContentType::Basic);
        assert_eq!(m.get("title").and_then(Yaml::as_str), Some("Reading Habits"));
        assert_eq!(
            m.get("description").and_then(Yaml::as_str),
            Some("Notes on how I read books. Second line.")
        );
        assert_eq!(m.get("status").and_then(Yaml::as_str), Some("draft"));
        assert_eq!(m.get("created").and_then(Yaml::as_str), Some("2024-03-15"));
        let tags = m.get("tags").and_then(Yaml::as_sequence).unwrap();
        assert_eq!(tags, &vec![Yaml::String("notes".into())]);
    }

    #[test]
    fn test_title_from_filename_when_no_heading() {
        assert_eq!(title_from_filename("a/deep_work-notes.md"), "Deep Work Notes");
    }

    #[test]
    fn test_validate_reports_problems() {
        let dir = tempdir().unwrap();
        let c = ctx(dir.path());
        let e = Enforcer::new(&c, today());
        let fm = FrontMatter::extract(
            "---\ntitle: T\ndescription: D\nstatus: done\ncreated: 15/03/2024\nupdated: 2024-03-15\ntags: x\n---\n",
        )
        .unwrap()
        .unwrap();
        let problems = e.validate(&fm, ContentType::Basic);
        assert_eq!(
            problems,
            vec![
                "Invalid value for status: done. Valid values: draft, in-review, published, deprecated, archived".to_string(),
                "Invalid date format for created: 15/03/2024. Expected: YYYY-MM-DD".to_string(),
                "Tags must be a list".to_string(),
            ]
        );
    }

    #[test]
    fn test_policy_vocab_overrides_builtin() {
        let dir = tempdir().unwrap();
        let policy = Policy::from_yaml("metadata:\n  controlled_vocabs:\n    status: [done]\n").unwrap();
        let c = CheckContext::new(policy, dir.path());
        let e = Enforcer::new(&c, today());
        let fm = FrontMatter::extract("---\nstatus: done\n---\n").unwrap().unwrap();
        assert!(e
            .validate(&fm, ContentType::Basic)
            .iter()
            .all(|p| p.starts_with("Missing required field")));
    }

    #[test]
    fn test_fix_adds_front_matter_and_round_trips() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let f = root.join("guide.md");
        fs::write(&f, "# Guide\n\nA short guide.\n").unwrap();
        let c = ctx(root);
        let e = Enforcer::new(&c, today());
        let (report, actions) = e.run(&[f.clone()], FixMode::Fix);
        assert!(report.is_clean());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "Added");
        assert!(actions[0].wrote);

        let written = fs::read_to_string(&f).unwrap();
        let fm = FrontMatter::extract(&written).unwrap().unwrap();
        for field in ContentType::Basic.required_fields() {
            assert!(fm.contains(field), "missing {field}");
        }
        assert!(fm.body.contains("# Guide"));
        // a second pass has nothing to do
        let (_, again) = e.run(&[f], FixMode::Fix);
        assert!(again.is_empty());
    }

    #[test]
    fn test_fix_fills_missing_fields_only() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let f = root.join("note.md");
        fs::write(&f, "---\ntitle: Mine\nupdated: 2000-01-01\n---\nBody here.\n").unwrap();
        let c = ctx(root);
        let e = Enforcer::new(&c, today());
        let (_, actions) = e.run(&[f.clone()], FixMode::Fix);
        assert_eq!(actions[0].action, "Fixed");
        let fm = FrontMatter::extract(&fs::read_to_string(&f).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(fm.get("title").and_then(Yaml::as_str), Some("Mine"));
        assert_eq!(fm.get("updated").and_then(Yaml::as_str), Some("2024-03-15"));
        assert_eq!(fm.get("description").and_then(Yaml::as_str), Some("Body here."));
        assert_eq!(fm.body, "Body here.\n");
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("x.md");
        fs::write(&f, "plain\n").unwrap();
        let c = ctx(dir.path());
        let e = Enforcer::new(&c, today());
        let (_, actions) = e.run(&[f.clone()], FixMode::DryRun);
        assert_eq!(actions.len(), 1);
        assert!(!actions[0].wrote);
        assert_eq!(fs::read_to_string(&f).unwrap(), "plain\n");
    }

    #[test]
    fn test_malformed_front_matter_is_reported_not_rewritten() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("x.md");
        fs::write(&f, "---\ntitle: [oops\n---\n").unwrap();
        let c = ctx(dir.path());
        let e = Enforcer::new(&c, today());
        let (report, actions) = e.run(&[f.clone()], FixMode::Fix);
        assert!(actions.is_empty());
        assert_eq!(report.violations.len(), 1);
        assert_eq!(fs::read_to_string(&f).unwrap(), "---\ntitle: [oops\n---\n");

        let (report, _) = e.run(&[f], FixMode::Check);
        assert_eq!(report.violations[0].check, "frontmatter/parse");
    }

    #[test]
    fn test_check_mode_reports_missing() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("x.md");
        fs::write(&f, "plain\n").unwrap();
        let c = ctx(dir.path());
        let (report, actions) = Enforcer::new(&c, today()).run(&[f], FixMode::Check);
        assert!(actions.is_empty());
        assert_eq!(report.violations[0].check, "frontmatter/missing");
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_scan_skips_tool_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for d in ["notes", "node_modules/x", ".git", "cache"] {
            fs::create_dir_all(root.join(d)).unwrap();
            fs::write(root.join(d).join("a.md"), "x").unwrap();
        }
        fs::write(root.join("notes/b.txt"), "x").unwrap();
        let c = ctx(root);
        let found = Enforcer::new(&c, today()).scan(root);
        assert_eq!(found, vec![root.join("notes/a.md")]);
    }

    #[test]
    fn test_citations_and_version() {
        let body = "See doi: 10.1000/xyz and arXiv: 2101.00001.\nversion: 2.3.4";
        assert_eq!(extract_citations(body), vec!["10.1000/xyz", "2101.00001."]);
        let dir = tempdir().unwrap();
        let c = ctx(dir.path());
        let m = Enforcer::new(&c, today()).generate("tools/x.md", body, ContentType::Technical);
        assert_eq!(m.get("version").and_then(Yaml::as_str), Some("2.3.4"));
    }
}
