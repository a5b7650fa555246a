//! kbguard CLI binary entry point.
//! Resolves configuration and policy, delegates to the checkers and prints
//! results.

use anyhow::Result;
use clap::Parser;
use kbguard::cli::{Cli, Commands, Common};
use kbguard::config::{self, Effective, OutputMode};
use kbguard::context::CheckContext;
use kbguard::enforce::{Enforcer, FixMode};
use kbguard::models::policy::Policy;
use kbguard::{filenames, links, metadata, output, structure, utils};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG overrides; --verbose => debug; else warn
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "kbguard=debug"
        } else {
            "kbguard=warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", utils::error_prefix());
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Commands::Filenames { files, common } => {
            if files.is_empty() {
                output::print_no_files("filename", output_hint(&common));
                return Ok(0);
            }
            let (eff, ctx) = load(common.repo_root.as_deref(), &common)?;
            let files = utils::expand_args(&files);
            let report = filenames::run(&ctx, &files);
            output::print_report(
                &report,
                eff.output,
                &format!("Filename validation passed for {} files", files.len()),
            );
            Ok(report.exit_code())
        }
        Commands::Metadata { files, common } => {
            if files.is_empty() {
                output::print_no_files("metadata", output_hint(&common));
                return Ok(0);
            }
            let (eff, ctx) = load(common.repo_root.as_deref(), &common)?;
            let files = utils::expand_args(&files);
            let report = metadata::run(&ctx, &files);
            output::print_report(
                &report,
                eff.output,
                &format!("Metadata validation passed for {} files", files.len()),
            );
            Ok(report.exit_code())
        }
        Commands::Structure {
            root,
            policy,
            output: out,
        } => {
            // the positional root is audited as given, never searched upward
            let common = Common {
                repo_root: Some(root),
                policy,
                output: out,
            };
            let (eff, ctx) = load(common.repo_root.as_deref(), &common)?;
            let report = structure::run(&ctx);
            output::print_report(
                &report,
                eff.output,
                "Knowledge base structure validation passed",
            );
            Ok(report.exit_code())
        }
        Commands::Links { paths, common } => {
            let (eff, ctx) = load(common.repo_root.as_deref(), &common)?;
            let files = if paths.is_empty() {
                links::markdown_files(&ctx, &eff.repo_root)
            } else {
                utils::expand_args(&paths)
                    .into_iter()
                    .flat_map(|p| {
                        if p.is_dir() {
                            links::markdown_files(&ctx, &p)
                        } else {
                            vec![p]
                        }
                    })
                    .collect()
            };
            let report = links::run(&ctx, &files);
            output::print_report(
                &report,
                eff.output,
                &format!("Link check passed for {} files", files.len()),
            );
            Ok(report.exit_code())
        }
        Commands::Frontmatter {
            paths,
            fix,
            dry_run,
            common,
        } => {
            let (eff, ctx) = load(common.repo_root.as_deref(), &common)?;
            let enforcer = Enforcer::new(&ctx, chrono::Local::now().date_naive());
            let files = markdown_targets(&enforcer, &eff.repo_root, &paths);
            let mode = match (fix, dry_run) {
                (true, true) => FixMode::DryRun,
                (true, false) => FixMode::Fix,
                _ => FixMode::Check,
            };
            let (report, actions) = enforcer.run(&files, mode);
            if mode == FixMode::Check {
                output::print_report(&report, eff.output, "All files are compliant");
            } else {
                output::print_fixes(&actions, &report, eff.output);
            }
            Ok(report.exit_code())
        }
    }
}

/// Resolve effective settings and build the shared check context.
fn load(repo_root: Option<&str>, common: &Common) -> Result<(Effective, CheckContext)> {
    let eff = config::resolve_effective(
        repo_root,
        repo_root.is_some(),
        common.policy.as_deref(),
        common.output.as_deref(),
    )?;
    if !eff.config_found {
        tracing::debug!(root = %eff.repo_root.display(), "no kbguard config found; using defaults");
    }
    let policy = Policy::load(&eff.policy_path)?;
    let ctx = CheckContext::new(policy, &eff.repo_root).with_skip_dirs(eff.skip_dirs.clone());
    Ok((eff, ctx))
}

fn output_hint(common: &Common) -> OutputMode {
    common
        .output
        .as_deref()
        .map(OutputMode::parse)
        .unwrap_or(OutputMode::Human)
}

/// Directories are scanned for Markdown files; other arguments are expanded
/// as globs. No arguments scans the repository root.
fn markdown_targets(enforcer: &Enforcer, root: &Path, args: &[String]) -> Vec<PathBuf> {
    if args.is_empty() {
        return enforcer.scan(root);
    }
    utils::expand_args(args)
        .into_iter()
        .flat_map(|p| {
            if p.is_dir() {
                enforcer.scan(&p)
            } else {
                vec![p]
            }
        })
        .collect()
}
