//! Pure formatting functions for UI output.
//!
//! Every `format_*` function returns the text without printing it so it can be
//! tested; the `display_*` wrappers print it.

use console::style;

use crate::charts::PlannedEdit;
use crate::cli::orchestration::{ReleasePreview, ReleaseReport};

/// Format an error line tagged with its category.
pub fn format_error(category: &str, message: &str) -> String {
    format!("{} {}", style(format!("ERROR[{}]:", category)).red().bold(), message)
}

/// Print an error line to stderr.
pub fn display_error(category: &str, message: &str) {
    eprintln!("{}", format_error(category, message));
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), message);
}

fn format_edit(edit: &PlannedEdit) -> String {
    format!(
        "  {} {}: {} -> {}",
        edit.target.path.display(),
        edit.target.field,
        style(&edit.current).red(),
        style(&edit.next).green()
    )
}

/// Format the summary shown before the confirmation gate.
///
/// Lists the current and target versions, the strategy, every planned
/// manifest edit and the refs that will be created.
pub fn format_release_summary(preview: &ReleasePreview) -> String {
    let mut lines = vec![
        format!("{}", style("Release summary").bold()),
        format!("  Branch:   {}", preview.branch),
        format!("  Current:  {}", style(&preview.current).red()),
        format!("  Next:     {}", style(&preview.next).green()),
        format!("  Strategy: {}", preview.strategy),
        format!("  Tag:      {}", preview.tag),
    ];
    if let Some(branch) = &preview.new_branch {
        lines.push(format!("  New branch: {}", branch));
    }

    lines.push(format!("{}", style("Manifest edits").underlined()));
    lines.extend(preview.edits.iter().map(format_edit));

    if preview.dry_run {
        lines.push(format!(
            "{} dry run: commit, tag and branch are created locally, nothing is pushed",
            style("→").yellow()
        ));
    }

    lines.join("\n")
}

pub fn display_release_summary(preview: &ReleasePreview) {
    println!("\n{}", format_release_summary(preview));
}

/// Format the outcome of a finished release.
pub fn format_release_report(report: &ReleaseReport) -> String {
    let mut lines = vec![format!(
        "{} Released {} (was {}), commit {}",
        style("✓").green(),
        style(&report.next).green().bold(),
        report.current,
        short_hash(&report.commit)
    )];
    lines.push(format!("  Tag: {}", report.tag));
    if let Some(branch) = &report.branch_created {
        lines.push(format!("  Branch: {}", branch));
    }
    lines.push(format!("  Files: {}", report.files.len()));
    if report.pushed {
        lines.push(format!("  Pushed to {}", report.remote));
    }
    lines.join("\n")
}

pub fn display_release_report(report: &ReleaseReport) {
    println!("\n{}", format_release_report(report));
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

/// Format the git command that publishes a dry-run release later.
pub fn format_manual_push_instruction(remote: &str, refs: &[String]) -> String {
    format!(
        "{} To push this release later, run:\n  {}",
        style("→").yellow(),
        style(format!("git push {} {}", remote, refs.join(" "))).cyan()
    )
}

pub fn display_manual_push_instruction(remote: &str, refs: &[String]) {
    println!("\n{}", format_manual_push_instruction(remote, refs));
}
