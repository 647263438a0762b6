//! Markdown rendering of a [`Plan`].

use std::fmt::Write as _;

use super::{Plan, PlanAction, PlanEntry};

fn push_entry(out: &mut String, entry: &PlanEntry) {
    let _ = write!(out, "- `{}` ({})", entry.path, entry.rationale);
    if !entry.strategy.is_default() {
        let _ = write!(out, " [{}, {}]", entry.strategy, entry.impact);
    }
    if let Some(summary) = &entry.diff_summary {
        let _ = write!(out, ": {summary}");
    }
    out.push('\n');
}

fn push_section<'a>(out: &mut String, title: &str, entries: impl Iterator<Item = &'a PlanEntry>) {
    let _ = writeln!(out, "## {title}\n");
    let mut any = false;
    for entry in entries {
        push_entry(out, entry);
        any = true;
    }
    if !any {
        out.push_str("_None_\n");
    }
    out.push('\n');
}

/// Render the plan document. Section order is fixed; `High-Impact Changes` and
/// `Warnings` appear only when non-empty.
pub fn render_plan(plan: &Plan) -> String {
    let mut out = String::from("# Migration Plan\n\n");
    if let (Some(from), Some(to)) = (&plan.from_version, &plan.to_version) {
        let _ = writeln!(out, "Upgrading from **{from}** to **{to}**.\n");
    }

    let s = &plan.summary;
    out.push_str("## Summary\n\n| Category | Count |\n|---|---|\n");
    for (label, count) in [
        ("New", s.new),
        ("Modified", s.modified),
        ("Deleted", s.deleted),
        ("Renamed", s.renamed),
        ("Unchanged", s.unchanged),
        ("Local only", s.local_only),
        ("Total changes", s.total_changes),
        ("Special files", s.special_files_count),
    ] {
        let _ = writeln!(out, "| {label} | {count} |");
    }
    out.push('\n');

    let high: Vec<&PlanEntry> = plan.high_impact().collect();
    if !high.is_empty() {
        out.push_str("## High-Impact Changes\n\n");
        for entry in high {
            let _ = writeln!(
                out,
                "- **{}** `{}`: {}",
                entry.action,
                entry.path,
                entry.warning.as_deref().unwrap_or_default()
            );
        }
        out.push('\n');
    }

    push_section(&mut out, "Files to Update", plan.entries_for(PlanAction::Update));
    push_section(&mut out, "Files to Add", plan.entries_for(PlanAction::Add));
    push_section(&mut out, "Files to Remove", plan.entries_for(PlanAction::Remove));

    out.push_str("## Structural Changes\n\n");
    let mut moves = plan.entries_for(PlanAction::Move).peekable();
    if moves.peek().is_none() {
        out.push_str("_None_\n");
    }
    for entry in moves {
        let _ = writeln!(
            out,
            "- `{}` -> `{}`",
            entry.old_path.as_deref().unwrap_or("?"),
            entry.path
        );
    }
    out.push('\n');

    out.push_str("## Directories to Create\n\n");
    if plan.directories_to_create.is_empty() {
        out.push_str("_None_\n");
    }
    for dir in &plan.directories_to_create {
        let _ = writeln!(out, "- `{dir}/`");
    }

    if !plan.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in &plan.warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    out
}
