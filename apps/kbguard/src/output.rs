//! Output rendering for checker reports and front-matter fixes.
//!
//! Supports `human` (default) and `json` outputs. Human output prints one
//! `ERROR:`/`WARNING:` line per violation; the JSON form carries the
//! violations and a top-level summary.

use crate::config::OutputMode;
use crate::enforce::FixAction;
use crate::models::{Report, Severity, Violation};
use crate::utils;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

/// Print a report. `success` is shown in human mode when the run passes.
pub fn print_report(report: &Report, output: OutputMode, success: &str) {
    match output {
        OutputMode::Json => println!("{}", to_pretty(&compose_report_json(report))),
        OutputMode::Human => {
            for line in human_lines(report, utils::use_colors(false)) {
                println!("{line}");
            }
            if report.exit_code() == 0 {
                println!("✅ {success}");
            }
        }
    }
}

/// Human lines, one per violation.
pub fn human_lines(report: &Report, color: bool) -> Vec<String> {
    report
        .violations
        .iter()
        .map(|v| format!("{} {}", severity_label(v, color), v.message))
        .collect()
}

fn severity_label(v: &Violation, color: bool) -> String {
    let label = v.severity.label();
    match (color, v.severity) {
        (false, _) => label.to_string(),
        (true, Severity::Error) => label.red().bold().to_string(),
        (true, Severity::Warning) => label.yellow().bold().to_string(),
    }
}

/// JSON document for a report.
pub fn compose_report_json(report: &Report) -> JsonVal {
    let items: Vec<JsonVal> = report
        .violations
        .iter()
        .map(|v| {
            json!({
                "path": v.path,
                "check": v.check,
                "severity": v.severity,
                "message": v.message,
            })
        })
        .collect();
    json!({
        "violations": items,
        "summary": {
            "errors": report.summary.errors,
            "warnings": report.summary.warnings,
            "files": report.summary.files,
        },
    })
}

/// Print front-matter fix actions followed by any per-file failures.
pub fn print_fixes(actions: &[FixAction], report: &Report, output: OutputMode) {
    match output {
        OutputMode::Json => {
            let mut out = compose_report_json(report);
            out["fixes"] = compose_fixes_json(actions);
            println!("{}", to_pretty(&out));
        }
        OutputMode::Human => {
            let color = utils::use_colors(false);
            for a in actions {
                let verb = if a.wrote {
                    format!("{}:", a.action.to_lowercase())
                } else {
                    format!("would be {}:", a.action.to_lowercase())
                };
                if color {
                    println!("{} {}", verb.green().bold(), a.file);
                } else {
                    println!("{verb} {}", a.file);
                }
            }
            for line in human_lines(report, color) {
                println!("{line}");
            }
            let wrote = actions.iter().filter(|a| a.wrote).count();
            if actions.is_empty() && report.is_clean() {
                println!("✅ All files are compliant");
            } else if wrote < actions.len() {
                println!(
                    "Dry run: {} file(s) would change. Use --fix without --dry-run to apply.",
                    actions.len()
                );
            } else if wrote > 0 {
                println!("✅ Front matter fixed in {wrote} file(s)");
            }
        }
    }
}

fn compose_fixes_json(actions: &[FixAction]) -> JsonVal {
    JsonVal::Array(
        actions
            .iter()
            .map(|a| json!({"file": a.file, "action": a.action, "wrote": a.wrote}))
            .collect(),
    )
}

/// Human or JSON line for "nothing to check".
pub fn print_no_files(kind: &str, output: OutputMode) {
    match output {
        OutputMode::Json => println!(
            "{}",
            to_pretty(&compose_report_json(&Report::new(
                Vec::new(),
                0,
                Default::default()
            )))
        ),
        OutputMode::Human => println!("✅ No files provided for {kind} validation"),
    }
}

fn to_pretty(v: &JsonVal) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}
