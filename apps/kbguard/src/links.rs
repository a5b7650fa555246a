//! Internal link checker.
//!
//! Every Markdown `[text](target)` whose target is not external must resolve
//! to an existing path, relative to the linking file or, for targets starting
//! with `/`, to the repository root. Links inside fenced code blocks are
//! ignored.

use crate::context::CheckContext;
use crate::models::{Report, Violation};
use crate::utils;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern compiles"));

const EXTERNAL_PREFIXES: &[&str] = &["http://", "https://", "mailto:", "tel:", "ftp://", "#"];

/// Check `files`, preserving input order in the report.
pub fn run(ctx: &CheckContext, files: &[PathBuf]) -> Report {
    let per_file: Vec<Vec<Violation>> = files.par_iter().map(|f| check_file(ctx, f)).collect();
    let found: Vec<Violation> = per_file.into_iter().flatten().collect();
    tracing::debug!(files = files.len(), broken = found.len(), "link check done");
    ctx.report(found, files.len())
}

/// Markdown files under `base`, sorted, with dot and cache directories pruned.
pub fn markdown_files(ctx: &CheckContext, base: &Path) -> Vec<PathBuf> {
    WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !utils::is_skipped_dir_name(&name, &ctx.skip_dirs)
        })
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|x| x == "md"))
        .map(|e| e.into_path())
        .collect()
}

pub fn check_file(ctx: &CheckContext, path: &Path) -> Vec<Violation> {
    let shown = utils::normalize_path(&path.to_string_lossy());
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return vec![Violation::error(
                "links/io",
                &shown,
                format!("{shown}: Error reading file - {e}"),
            )]
        }
    };
    broken_links(ctx, path, &content)
        .into_iter()
        .map(|(text, target)| {
            Violation::error(
                "links/broken",
                &shown,
                format!("{shown}: Broken link '{target}' ({text})"),
            )
        })
        .collect()
}

/// `(text, target)` of every internal link in `content` that does not resolve.
pub fn broken_links(ctx: &CheckContext, source: &Path, content: &str) -> Vec<(String, String)> {
    let base = source.parent().unwrap_or(Path::new(""));
    let mut in_fence = false;
    let mut out = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        for cap in LINK.captures_iter(line) {
            let raw = cap[2].trim();
            let Some(target) = link_path(raw) else { continue };
            let resolved = match target.strip_prefix('/') {
                Some(rooted) => ctx.root.join(rooted),
                None => base.join(target.strip_prefix("./").unwrap_or(&target)),
            };
            if !resolved.exists() {
                out.push((cap[1].to_string(), raw.to_string()));
            }
        }
    }
    out
}

/// Filesystem part of a link target; `None` for external links and anchors.
fn link_path(raw: &str) -> Option<String> {
    if EXTERNAL_PREFIXES.iter().any(|p| raw.starts_with(p)) {
        return None;
    }
    let raw = raw.trim_start_matches('<');
    // drop an optional title: [a](b.md "Title")
    let target = raw.split_whitespace().next()?.trim_end_matches('>');
    let target = target.split(['#', '?']).next().unwrap_or("");
    if target.is_empty() {
        return None;
    }
    Some(target.replace("%20", " "))
}
