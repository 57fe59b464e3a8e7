//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text; `display_*` functions print it.

use crate::analyzer::VersionAdvice;
use crate::boundary::BoundaryWarning;
use crate::domain::Category;
use crate::flow::{AbandonReport, CreateReport, FinishReport, FlowStatus};
use crate::guard::GuardResult;
use console::style;
use std::fmt::Write;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

pub fn display_guard_result(result: &GuardResult) {
    if result.allowed {
        display_success(&result.message);
    } else {
        display_error(&format_guard_denial(result));
    }
}

pub fn format_guard_denial(result: &GuardResult) -> String {
    match result.kind {
        Some(kind) => format!("[{}] {}", kind, result.message),
        None => result.message.clone(),
    }
}

/// Version advice with counts and exemplar subjects per category.
pub fn format_advice(advice: &VersionAdvice) -> String {
    let mut out = String::new();
    let current = advice
        .current_tag
        .clone()
        .unwrap_or_else(|| format!("{} (no tag)", advice.current_version));
    let _ = writeln!(out, "{}", style("Version Analysis").bold());
    let _ = writeln!(out, "  Current:   {}", current);

    match &advice.suggested_tag {
        Some(tag) => {
            let _ = writeln!(out, "  Suggested: {}", style(tag).green().bold());
        }
        None => {
            let _ = writeln!(out, "  Suggested: {}", style("none").dim());
        }
    }
    let _ = writeln!(out, "  Bump:      {}", advice.bump);
    let _ = writeln!(out, "  Reason:    {}", advice.reason);

    let total: usize = advice.counts_by_category.values().sum();
    if total > 0 {
        let _ = writeln!(out, "\n{}", style(format!("Commits ({})", total)).underlined());
        for (category, count) in &advice.counts_by_category {
            if *count == 0 {
                continue;
            }
            let _ = writeln!(out, "  {}: {}", category_label(*category), count);
            for subject in advice.exemplars.get(category).into_iter().flatten() {
                let _ = writeln!(out, "    - {}", subject);
            }
            let shown = advice.exemplars.get(category).map_or(0, Vec::len);
            if *count > shown {
                let _ = writeln!(out, "    ... and {} more", count - shown);
            }
        }
    }
    out
}

fn category_label(category: Category) -> String {
    match category {
        Category::Breaking => style(category.title()).red().to_string(),
        Category::Features => style(category.title()).green().to_string(),
        Category::Fixes => style(category.title()).yellow().to_string(),
        Category::Other => category.title().to_string(),
    }
}

pub fn format_create(report: &CreateReport) -> String {
    let mut out = format!(
        "Created {} from {} (tracking {})",
        style(&report.branch).bold(),
        report.base,
        report.upstream
    );
    if let Some(version) = &report.version {
        let _ = write!(out, "\n  Version: {}", version);
    }
    out
}

pub fn format_finish(report: &FinishReport) -> String {
    let mut out = format!("Finished {}", style(&report.branch).bold());
    for merge in &report.merges {
        let short = merge.commit.get(..7).unwrap_or(merge.commit.as_str());
        let _ = write!(out, "\n  Merged into {} ({})", merge.target, short);
    }
    if let Some(tag) = &report.tag {
        let _ = write!(out, "\n  Tagged {}", style(tag).green().bold());
    }
    if report.deleted {
        let _ = write!(out, "\n  Deleted {}", report.branch);
    }
    let _ = write!(out, "\n  Now on {}", report.current_branch);
    out
}

pub fn format_abandon(report: &AbandonReport) -> String {
    format!(
        "Abandoned {}; now on {}",
        style(&report.branch).bold(),
        report.returned_to
    )
}

pub fn format_flow_status(status: &FlowStatus) -> String {
    let mut out = String::new();
    let branch = status.current_branch.as_deref().unwrap_or("(detached HEAD)");
    let _ = writeln!(out, "{}", style("Git Flow Status").bold());
    let _ = writeln!(out, "  Branch: {} [{:?}]", style(branch).cyan(), status.state);

    if status.clean {
        let _ = writeln!(out, "  Working tree: {}", style("clean").green());
    } else {
        let _ = writeln!(
            out,
            "  Working tree: {} ({})",
            style("dirty").red(),
            status.dirty_paths.join(", ")
        );
    }

    if let Some(sync) = &status.sync {
        match &sync.upstream {
            Some(upstream) => {
                let _ = writeln!(
                    out,
                    "  Upstream: {} (ahead {}, behind {})",
                    upstream, sync.ahead, sync.behind
                );
            }
            None => {
                let _ = writeln!(out, "  Upstream: {}", style("none").dim());
            }
        }
    }

    let _ = writeln!(
        out,
        "  Latest tag: {}",
        status.latest_tag.as_deref().unwrap_or("none")
    );

    let _ = writeln!(out, "\n{}", style("Branches").underlined());
    for (kind, names) in &status.branches {
        let _ = writeln!(out, "  {}: {}", kind, names.join(", "));
    }

    if status.kind.map_or(false, |k| k.is_flow()) {
        if status.issues.is_empty() {
            let _ = writeln!(out, "\n{} Ready to finish", style("✓").green());
        } else {
            let _ = writeln!(out, "\n{}", style("Not ready to finish:").yellow());
            for issue in &status.issues {
                let _ = writeln!(out, "  - {}", issue);
            }
        }
    }
    out
}
