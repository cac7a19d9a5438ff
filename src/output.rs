//! Operator-facing build output.
//!
//! Formatting is pure (`format_*` returns lines) so it can be tested;
//! `print_*` writes those lines to stdout. Diagnostics for individual
//! skipped files go through `tracing` as they happen; this is the summary
//! printed once the build is over.
//!
//! ```text
//! Rendered
//!     about/index.yaml → about/index.html
//!     index.yaml → index.html
//! Copied
//!     style.css
//! Skipped
//!     drafts/todo.yaml: no `layout` field
//!     broken.yaml: unknown processor `nope` in tag `!nope` (known: ...)
//!
//! 2 rendered, 1 copied, 2 skipped
//! ```

use crate::site::{BuildReport, FileOutcome};

// ============================================================================
// Build report
// ============================================================================

/// Format a build report grouped by outcome, followed by a count line.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut rendered = Vec::new();
    let mut passed = Vec::new();
    let mut skipped = Vec::new();

    for file in &report.files {
        let source = file.source.display();
        match &file.outcome {
            FileOutcome::Rendered { output } => {
                rendered.push(format!("    {source} → {}", output.display()));
            }
            FileOutcome::Copied { .. } => passed.push(format!("    {source}")),
            FileOutcome::Linked { .. } => passed.push(format!("    {source} (symlink)")),
            FileOutcome::SkippedNoLayout => {
                skipped.push(format!("    {source}: no `layout` field"));
            }
            FileOutcome::SkippedLayoutNotFound { layout } => {
                skipped.push(format!("    {source}: layout `{layout}` not found"));
            }
            FileOutcome::SkippedLoadError { error } | FileOutcome::SkippedRenderError { error } => {
                skipped.push(format!("    {source}: {error}"));
            }
        }
    }

    let mut lines = Vec::new();
    for (heading, group) in [("Rendered", rendered), ("Copied", passed), ("Skipped", skipped)] {
        if !group.is_empty() {
            lines.push(heading.to_string());
            lines.extend(group);
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(summary_line(report));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

/// One-line counts, also used after each rebuild in watch mode.
pub fn summary_line(report: &BuildReport) -> String {
    format!(
        "{} rendered, {} copied, {} skipped",
        report.rendered(),
        report.passed_through(),
        report.skipped().count()
    )
}

// ============================================================================
// Tests
// ============================================================================
