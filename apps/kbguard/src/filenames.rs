//! Filename checker for an explicit list of files (pre-commit style).
//!
//! Each file is checked independently against:
//! - the global naming rules,
//! - the `filename` pattern of every path rule matching its directory,
//! - extension screening against `files.allowed_extensions`,
//! - the `files.max_file_size_mb` limit (best effort).

use crate::context::CheckContext;
use crate::models::{Report, Violation};
use crate::utils;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions flagged when they are not listed in any allowed category.
const PROBLEMATIC_EXTENSIONS: &[&str] = &[".exe", ".bin", ".dmg", ".deb", ".rpm"];

/// Check all `files`, preserving input order in the report.
pub fn run(ctx: &CheckContext, files: &[PathBuf]) -> Report {
    let per_file: Vec<Vec<Violation>> = files.par_iter().map(|f| check_file(ctx, f)).collect();
    let found: Vec<Violation> = per_file.into_iter().flatten().collect();
    tracing::debug!(files = files.len(), violations = found.len(), "filename check done");
    ctx.report(found, files.len())
}

/// Check a single file. Paths inside skipped directories yield nothing.
pub fn check_file(ctx: &CheckContext, path: &Path) -> Vec<Violation> {
    let display = utils::normalize_path(&path.to_string_lossy());
    if utils::in_skipped_dir(&display, &ctx.skip_dirs) {
        tracing::trace!(file = %path.display(), "skipped");
        return Vec::new();
    }
    let filename = match path.file_name() {
        Some(n) => n.to_string_lossy().to_string(),
        None => return Vec::new(),
    };
    let rel = ctx.relative(path);

    let mut out = ctx.naming.check(&filename, &display);
    out.extend(check_path_rules(ctx, &rel, &filename, &display));
    out.extend(check_extension(ctx, &filename, &display));
    out.extend(check_size(ctx, path, &display));
    out
}

fn check_path_rules(ctx: &CheckContext, rel: &str, filename: &str, display: &str) -> Vec<Violation> {
    ctx.rules
        .for_file(rel)
        .filter(|rule| !rule.accepts_filename(filename))
        .map(|rule| {
            Violation::error(
                "paths/filename",
                display,
                format!(
                    "Filename doesn't match pattern for {}: {display}",
                    rule.source
                ),
            )
        })
        .collect()
}

fn check_extension(ctx: &CheckContext, filename: &str, display: &str) -> Option<Violation> {
    let files = &ctx.policy.files;
    if files.allowed_extensions.is_empty() {
        return None;
    }
    let ext = extension_of(filename)?;
    if files.lists_extension(&ext) || !PROBLEMATIC_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(Violation::error(
        "files/extension",
        display,
        format!("Potentially problematic file extension: {display}"),
    ))
}

fn check_size(ctx: &CheckContext, path: &Path, display: &str) -> Option<Violation> {
    let limit = ctx.policy.files.max_file_size_mb;
    // size is best effort: unreadable metadata is not a violation
    let bytes = fs::metadata(path).ok()?.len();
    let size_mb = bytes as f64 / (1024.0 * 1024.0);
    (size_mb > limit).then(|| {
        Violation::error(
            "files/size",
            display,
            format!("File size ({size_mb:.1}MB) exceeds limit ({limit}MB): {display}"),
        )
    })
}

/// Lowercased final extension with its leading dot; `None` for dot-files.
fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
}
