//! Configuration discovery and effective settings resolution.
//!
//! kbguard reads `kbguard.toml|yaml|yml` from the repository root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `policy`: `.kb/policy/kb-policy.yaml`
//! - `output`: `human`
//! - `skip_dirs`: none beyond the built-in cache directories
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::KbError;
use crate::models::policy::DEFAULT_POLICY_PATH;
use crate::utils::ROOT_MARKER;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILES: [&str; 3] = ["kbguard.toml", "kbguard.yaml", "kbguard.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `kbguard.toml|yaml`.
pub struct KbguardConfig {
    pub policy: Option<String>,
    pub output: Option<String>,
    #[serde(default)]
    pub skip_dirs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    /// Unknown values fall back to `human`.
    pub fn parse(s: &str) -> OutputMode {
        if s.eq_ignore_ascii_case("json") {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub policy_path: PathBuf,
    pub output: OutputMode,
    pub skip_dirs: Vec<String>,
    pub config_found: bool,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops at a `kbguard.toml|yaml|yml`, a `.kb` directory or a `.git` entry.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let start = fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    let mut cur = start.as_path();
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) {
            return cur.to_path_buf();
        }
        if cur.join(ROOT_MARKER).is_dir() || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.clone(),
        }
    }
}

/// Load `KbguardConfig` from `kbguard.toml` or `kbguard.yaml|yml` if present.
///
/// A present but malformed file is an error.
pub fn load_config(root: &Path) -> Result<Option<KbguardConfig>, KbError> {
    let toml_path = root.join("kbguard.toml");
    if toml_path.exists() {
        let s = read(&toml_path)?;
        let cfg: KbguardConfig = toml::from_str(&s).map_err(|e| KbError::Config {
            path: toml_path.clone(),
            reason: e.to_string(),
        })?;
        return Ok(Some(cfg));
    }
    for yml in ["kbguard.yaml", "kbguard.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = read(&p)?;
            let cfg: KbguardConfig = serde_yaml::from_str(&s).map_err(|e| KbError::Config {
                path: p.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

fn read(path: &Path) -> Result<String, KbError> {
    fs::read_to_string(path).map_err(|e| KbError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
///
/// `cli_repo_root` is taken as the root when `exact_root` is set; otherwise
/// the root is detected upward from it (or from the current directory).
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    exact_root: bool,
    cli_policy: Option<&str>,
    cli_output: Option<&str>,
) -> Result<Effective, KbError> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = if exact_root {
        fs::canonicalize(&start).unwrap_or(start)
    } else {
        detect_repo_root(&start)
    };
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let policy = cli_policy
        .map(|s| s.to_string())
        .or(cfg.policy)
        .unwrap_or_else(|| DEFAULT_POLICY_PATH.to_string());
    let policy_path = if Path::new(&policy).is_absolute() {
        PathBuf::from(policy)
    } else {
        repo_root.join(policy)
    };

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .map(|s| OutputMode::parse(&s))
        .unwrap_or(OutputMode::Human);

    Ok(Effective {
        repo_root,
        policy_path,
        output,
        skip_dirs: cfg.skip_dirs.unwrap_or_default(),
        config_found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("kbguard.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
policy = "policy/custom.yaml"
output = "json"
skip_dirs = ["build"]
    "#
        )
        .unwrap();
        fs::create_dir_all(root.join("notes/deep")).unwrap();

        // detection walks up from a nested directory
        let nested = root.join("notes/deep");
        let eff = resolve_effective(nested.to_str(), false, None, None).unwrap();
        let canon = fs::canonicalize(root).unwrap();
        assert_eq!(eff.repo_root, canon);
        assert_eq!(eff.policy_path, canon.join("policy/custom.yaml"));
        assert_eq!(eff.output, OutputMode::Json);
        assert_eq!(eff.skip_dirs, vec!["build".to_string()]);
        assert!(eff.config_found);
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("kbguard.yaml"), "output: human\n").unwrap();
        let eff = resolve_effective(root.to_str(), true, None, None).unwrap();
        assert_eq!(eff.output, OutputMode::Human);
        assert!(eff.policy_path.ends_with(".kb/policy/kb-policy.yaml"));
        assert!(eff.skip_dirs.is_empty());
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("kbguard.toml"),
            "policy = \"a.yaml\"\noutput = \"json\"\n",
        )
        .unwrap();
        let eff = resolve_effective(root.to_str(), true, Some("b.yaml"), Some("human")).unwrap();
        assert!(eff.policy_path.ends_with("b.yaml"));
        assert_eq!(eff.output, OutputMode::Human);
    }

    #[test]
    fn test_kb_marker_detects_root_without_config() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".kb/policy")).unwrap();
        fs::create_dir_all(root.join("notes")).unwrap();
        let eff = resolve_effective(root.join("notes").to_str(), false, None, None).unwrap();
        assert_eq!(eff.repo_root, fs::canonicalize(root).unwrap());
        assert!(!eff.config_found);
    }

    #[test]
    fn test_malformed_config_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("kbguard.toml"), "policy = [").unwrap();
        let err = resolve_effective(dir.path().to_str(), true, None, None).unwrap_err();
        assert!(err.is_fatal());
    }
}
