//! Supporting helpers: colored prefixes, path normalization, walk filters and
//! argument expansion.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Component, Path, PathBuf};

/// Directory names skipped by every tree walk and by the filename checker.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    "node_modules",
];

/// Dot-directory that holds the policy and is still subject to naming checks.
pub const ROOT_MARKER: &str = ".kb";

/// Colors are used only for terminals and when `NO_COLOR` is unset.
pub fn use_colors(stderr: bool) -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if stderr {
        std::io::stderr().is_terminal()
    } else {
        std::io::stdout().is_terminal()
    }
}

pub fn error_prefix() -> String {
    if use_colors(true) {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors(true) {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Convert backslashes and drop leading `./` segments.
pub fn normalize_path(raw: &str) -> String {
    let mut s = raw.replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    s
}

/// Render `path` relative to `root` when it lives inside it; otherwise return
/// the normalized path as given.
pub fn repo_relative(path: &Path, root: &Path) -> String {
    let abs = if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        std::env::current_dir().ok().map(|cwd| cwd.join(path))
    };
    if let Some(rel) = abs.and_then(|a| pathdiff::diff_paths(a, root)) {
        let escapes = rel
            .components()
            .next()
            .is_some_and(|c| matches!(c, Component::ParentDir));
        if !escapes && !rel.as_os_str().is_empty() {
            return normalize_path(&rel.to_string_lossy());
        }
    }
    normalize_path(&path.to_string_lossy())
}

/// Whether any component of `path` is one of the skipped directory names.
pub fn in_skipped_dir(path: &str, extra: &[String]) -> bool {
    let normalized = normalize_path(path);
    let mut parts: Vec<&str> = normalized.split('/').collect();
    // last component is the entry itself
    parts.pop();
    parts
        .iter()
        .any(|p| SKIP_DIRS.contains(p) || extra.iter().any(|e| e == p))
}

pub fn is_skipped_dir_name(name: &str, extra: &[String]) -> bool {
    SKIP_DIRS.contains(&name) || extra.iter().any(|e| e == name)
}

/// Expand arguments containing glob metacharacters; others pass through.
/// A pattern without matches is kept literally so it can be reported.
pub fn expand_args(args: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for arg in args {
        if !arg.contains(['*', '?', '[']) {
            out.push(PathBuf::from(arg));
            continue;
        }
        match glob::glob(arg) {
            Ok(paths) => {
                let before = out.len();
                out.extend(paths.flatten());
                if out.len() == before {
                    tracing::debug!(pattern = %arg, "glob matched nothing");
                    out.push(PathBuf::from(arg));
                }
            }
            Err(e) => {
                tracing::warn!(pattern = %arg, error = %e, "invalid glob pattern; using literally");
                out.push(PathBuf::from(arg));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./a\\b/c.md"), "a/b/c.md");
        assert_eq!(normalize_path("././x"), "x");
        assert_eq!(normalize_path("notes/x.md"), "notes/x.md");
    }

    #[test]
    fn test_repo_relative_inside_and_outside_root() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        assert_eq!(repo_relative(&root.join("notes/a.md"), root), "notes/a.md");
        let other = tempdir().unwrap();
        let outside = other.path().join("x.md");
        assert_eq!(
            repo_relative(&outside, root),
            normalize_path(&outside.to_string_lossy())
        );
    }

    #[test]
    fn test_in_skipped_dir() {
        assert!(in_skipped_dir("node_modules/pkg/index.js", &[]));
        assert!(in_skipped_dir("a/.git/config", &[]));
        assert!(!in_skipped_dir("notes/node_modules", &[]));
        assert!(in_skipped_dir("build/out.md", &["build".to_string()]));
    }

    #[test]
    fn test_expand_args_globs_and_literals() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "x").unwrap();
        std::fs::write(dir.path().join("b.md"), "x").unwrap();
        let pattern = format!("{}/*.md", dir.path().to_string_lossy());
        let out = expand_args(&[pattern, "plain name.md".to_string()]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], PathBuf::from("plain name.md"));
    }
}
