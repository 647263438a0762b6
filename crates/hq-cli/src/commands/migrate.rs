//! Migrate command implementation

use std::path::Path;

use colored::Colorize;
use hq_core::{AssumeYes, Confirm, DirectoryTemplate, MigrationReport, Outcome};

use super::plan::migrator;
use crate::context::Context;
use crate::error::{CliError, Result};
use crate::interactive::TerminalConfirm;

/// Run the migrate command
pub fn run_migrate(
    ctx: &Context,
    template: &Path,
    baseline: Option<&Path>,
    dry_run: bool,
    yes: bool,
    json: bool,
) -> Result<()> {
    let confirm: &dyn Confirm = if yes { &AssumeYes } else { &TerminalConfirm };
    let report = migrator(ctx, baseline)?
        .dry_run(dry_run)
        .run(&DirectoryTemplate::new(template), confirm)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match &report.outcome {
        Outcome::Aborted { phase, reason } => Err(CliError::user(format!(
            "Migration aborted during {phase}; nothing was changed: {reason}"
        ))),
        Outcome::CriticalFailure { phase, reason } => Err(CliError::user(format!(
            "Migration halted during {phase}: {reason}. Restore with `hq-migrate restore`."
        ))),
        _ => Ok(()),
    }
}

fn print_report(report: &MigrationReport) {
    println!(
        "{} {} -> {}",
        "Migration".bold(),
        report.from_version.cyan(),
        report.to_version.cyan()
    );

    match &report.outcome {
        Outcome::UpToDate => {
            println!("{} Installation already matches the template.", "OK".green().bold());
            return;
        }
        Outcome::DryRun => {
            if let Some(plan) = &report.plan {
                print!("{}", hq_core::render_plan(plan));
            }
            println!();
            println!("{} Dry run; nothing was written.", "NOTE".yellow().bold());
            return;
        }
        Outcome::Declined => {
            println!("{} Cancelled; nothing was written.", "NOTE".yellow().bold());
            return;
        }
        _ => {}
    }

    if let Some(dir) = &report.backup_dir {
        println!("{}: {}", "Backup".dimmed(), dir.display());
    }
    for change in &report.applied {
        match &change.old_path {
            Some(old) => println!("  {} {} -> {}", change.action.to_string().green(), old, change.path),
            None => println!("  {} {}", change.action.to_string().green(), change.path),
        }
    }
    for skipped in &report.skipped {
        println!("  {} {}", "SKIP".yellow(), skipped);
    }
    for failed in &report.failed {
        println!("  {} {}", "FAIL".red().bold(), failed);
    }
    if !report.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }

    let completed: Vec<String> = report.phases_completed.iter().map(ToString::to_string).collect();
    println!();
    println!("{}: {}", "Phases completed".dimmed(), completed.join(", "));
    if report.outcome == Outcome::Completed {
        println!(
            "{} {} changes applied.",
            "OK".green().bold(),
            report.applied.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_test_utils::sample::{installation_v1, template_v2};

    #[test]
    fn migrate_with_yes_applies() {
        let local = installation_v1();
        let template = template_v2();
        let ctx = Context::load(local.root(), None, None).unwrap();

        run_migrate(&ctx, template.root(), None, false, true, false).unwrap();

        local.assert_file_contains(".hq-version", "2.0.0");
        local.assert_exists(".hq-backup");
    }

    #[test]
    fn dry_run_leaves_installation_alone() {
        let local = installation_v1();
        let template = template_v2();
        let ctx = Context::load(local.root(), None, None).unwrap();

        run_migrate(&ctx, template.root(), None, true, true, true).unwrap();

        local.assert_file_contains(".hq-version", "1.0.0");
        local.assert_not_exists(".hq-backup");
    }
}
