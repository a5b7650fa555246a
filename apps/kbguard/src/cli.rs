//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kbguard",
    version,
    about = "Policy checks for a Markdown knowledge base",
    long_about = "kbguard: validate filenames, front-matter metadata and directory structure of a knowledge base against .kb/policy/kb-policy.yaml.\n\nConfiguration precedence: CLI > kbguard.toml > defaults.",
    after_help = "Examples:\n  kbguard filenames notes/*.md\n  kbguard metadata 'projects/**/*.md' --output json\n  kbguard structure .\n  kbguard links notes\n  kbguard frontmatter docs --fix --dry-run",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, short, global = true, action = clap::ArgAction::SetTrue, help = "Enable debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Clone, Default)]
/// Flags shared by every checking subcommand.
pub struct Common {
    #[arg(long, help = "Repository root (default: detected from current dir)")]
    pub repo_root: Option<String>,
    #[arg(long, help = "Policy file (default: .kb/policy/kb-policy.yaml)")]
    pub policy: Option<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current kbguard version.")]
    Version,
    /// Check filenames of the given files
    #[command(
        alias = "filename-checker",
        about = "Check filenames",
        long_about = "Check spaces, allowed characters, case convention, path-rule patterns, extensions and size limits for each file.",
        after_help = "Examples:\n  kbguard filenames 'my file.md'\n  kbguard filenames $(git diff --cached --name-only)"
    )]
    Filenames {
        #[arg(help = "Files to check (glob patterns are expanded)")]
        files: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
    /// Validate document metadata against schemas
    #[command(
        alias = "metadata-validator",
        about = "Validate metadata",
        long_about = "Validate Markdown front matter and YAML/JSON documents against the schema of every matching path rule, then check controlled vocabularies.",
        after_help = "Examples:\n  kbguard metadata notes/idea.md\n  kbguard metadata 'data/*.json' --output json"
    )]
    Metadata {
        #[arg(help = "Files to validate (glob patterns are expanded)")]
        files: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
    /// Audit the repository layout
    #[command(
        alias = "structure-validator",
        about = "Audit structure",
        long_about = "Check required paths, per-directory filename patterns and required files, and naming of every file and directory in the tree.",
        after_help = "Examples:\n  kbguard structure\n  kbguard structure path/to/kb"
    )]
    Structure {
        #[arg(default_value = ".", help = "Repository root to audit")]
        root: String,
        #[arg(long, help = "Policy file (default: .kb/policy/kb-policy.yaml)")]
        policy: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Find broken internal links
    #[command(
        about = "Check internal links",
        long_about = "Report Markdown links whose target does not exist. Targets are resolved relative to the linking file, or to the repository root when they start with '/'. External links and anchors are skipped.",
        after_help = "Examples:\n  kbguard links\n  kbguard links notes 'projects/*.md'"
    )]
    Links {
        #[arg(help = "Files or directories (default: repository root)")]
        paths: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
    /// Inspect or fix Markdown front matter
    #[command(
        about = "Enforce front matter",
        long_about = "Report missing or invalid front-matter fields. With --fix, generate missing fields from the document; existing values are kept except `updated`.",
        after_help = "Examples:\n  kbguard frontmatter\n  kbguard frontmatter docs --fix --dry-run"
    )]
    Frontmatter {
        #[arg(help = "Files or directories (default: repository root)")]
        paths: Vec<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Add missing fields to files")]
        fix: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, requires = "fix", help = "Preview fixes without writing")]
        dry_run: bool,
        #[command(flatten)]
        common: Common,
    },
}
