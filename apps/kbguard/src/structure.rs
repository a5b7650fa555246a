//! Structure auditor: required root paths, per-rule directory contents,
//! global naming across the whole tree and empty Markdown documents.
//!
//! Walks are sorted by file name so output is deterministic.

use crate::context::CheckContext;
use crate::frontmatter::FrontMatter;
use crate::models::{Report, Violation};
use crate::naming::EntryKind;
use crate::utils::{self, ROOT_MARKER};
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Run all structure checks and count the directories audited.
pub fn run(ctx: &CheckContext) -> Report {
    let mut found = check_required(ctx);
    found.extend(check_tree(ctx));
    found.extend(check_naming_global(ctx));
    found.extend(check_content(ctx));
    let dirs = audited_dirs(ctx).count();
    tracing::debug!(dirs, violations = found.len(), "structure audit done");
    ctx.report(found, dirs)
}

/// Every `require` entry must exist relative to the root.
pub fn check_required(ctx: &CheckContext) -> Vec<Violation> {
    ctx.policy
        .require
        .iter()
        .map(|r| r.path())
        .filter(|p| !ctx.root.join(p).exists())
        .map(|p| {
            Violation::error(
                "structure/required",
                p,
                format!("Missing required file: {p}"),
            )
        })
        .collect()
}

/// For each directory matched by a path rule, check its files against the
/// rule's `filename` pattern and its `required_files`.
pub fn check_tree(ctx: &CheckContext) -> Vec<Violation> {
    let mut out = Vec::new();
    for dir in audited_dirs(ctx) {
        let rel = ctx.relative(dir.path());
        let mut matching = ctx.rules.matching(&rel).peekable();
        if matching.peek().is_none() {
            continue;
        }
        let files = list_files(dir.path());
        for rule in matching {
            if rule.filename.is_some() {
                for name in files.iter().filter(|f| !rule.accepts_filename(f)) {
                    out.push(Violation::error(
                        "structure/filename",
                        format!("{rel}/{name}"),
                        format!(
                            "Filename policy violation in {rel}/: '{name}' doesn't match pattern for {}",
                            rule.source
                        ),
                    ));
                }
            }
            for required in &rule.required_files {
                if !dir.path().join(required).exists() {
                    out.push(Violation::error(
                        "structure/required-in-dir",
                        format!("{rel}/{required}"),
                        format!("Missing required file in {rel}/: {required}"),
                    ));
                }
            }
        }
    }
    out
}

/// Check every file and directory name in the tree with the naming engine's
/// spaces and allowed-characters stages.
pub fn check_naming_global(ctx: &CheckContext) -> Vec<Violation> {
    let walker = WalkDir::new(&ctx.root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !skip_for_naming(ctx, e));
    let mut out = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable entry during naming walk");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        let rel = ctx.relative(entry.path());
        let kind = if entry.file_type().is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        out.extend(ctx.naming.check_name(&name, &rel, kind));
    }
    out
}

/// Empty Markdown files are errors. With `files.min_content_chars` set,
/// documents whose body (front matter excluded) is shorter are warnings.
pub fn check_content(ctx: &CheckContext) -> Vec<Violation> {
    let minimum = ctx.policy.files.min_content_chars;
    let mut out = Vec::new();
    let dirs = std::iter::once(ctx.root.clone())
        .chain(audited_dirs(ctx).map(DirEntry::into_path));
    for dir in dirs {
        for name in list_files(&dir).iter().filter(|n| n.ends_with(".md")) {
            let path = dir.join(name);
            let rel = ctx.relative(&path);
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(file = %rel, error = %e, "cannot read document");
                    continue;
                }
            };
            if content.trim().is_empty() {
                out.push(Violation::error(
                    "structure/empty-file",
                    &rel,
                    format!("Empty file: {rel}"),
                ));
                continue;
            }
            let Some(minimum) = minimum else { continue };
            let chars = body_chars(&content);
            if chars < minimum {
                out.push(Violation::warning(
                    "structure/minimal-content",
                    &rel,
                    format!("Minimal content file ({chars} chars): {rel}"),
                ));
            }
        }
    }
    out
}

/// Characters of non-blank body lines, trimmed and newline-joined.
fn body_chars(content: &str) -> usize {
    let body = match FrontMatter::extract(content) {
        Ok(Some(fm)) => fm.body,
        _ => content.to_string(),
    };
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .chars()
        .count()
}

/// Directories below the root that rule checks apply to: dot-directories and
/// cache directories are pruned together with their subtrees.
fn audited_dirs(ctx: &CheckContext) -> impl Iterator<Item = DirEntry> + '_ {
    WalkDir::new(&ctx.root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && (is_dot_dir(e) || is_cache_dir(ctx, e)))
        })
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "unreadable entry during tree walk");
                None
            }
        })
        .filter(|e| e.file_type().is_dir())
}

fn skip_for_naming(ctx: &CheckContext, e: &DirEntry) -> bool {
    if !e.file_type().is_dir() {
        return false;
    }
    if is_cache_dir(ctx, e) {
        return true;
    }
    // the policy marker directory at the root stays in scope
    is_dot_dir(e) && !(e.depth() == 1 && e.file_name() == ROOT_MARKER)
}

fn is_dot_dir(e: &DirEntry) -> bool {
    e.file_name().to_string_lossy().starts_with('.')
}

fn is_cache_dir(ctx: &CheckContext, e: &DirEntry) -> bool {
    utils::is_skipped_dir_name(&e.file_name().to_string_lossy(), &ctx.skip_dirs)
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => rd
            .flatten()
            .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot list directory");
            Vec::new()
        }
    };
    names.sort();
    names
}
