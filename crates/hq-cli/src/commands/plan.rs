//! Plan command implementation
//!
//! A dry-run migration whose plan is rendered instead of applied.

use std::path::{Path, PathBuf};

use colored::Colorize;
use hq_core::{AssumeYes, DirectoryTemplate, Migrator, Outcome, render_plan};

use crate::context::Context;
use crate::error::{CliError, Result};

pub(crate) fn migrator(ctx: &Context, baseline: Option<&Path>) -> Result<Migrator> {
    let mut migrator = Migrator::new(&ctx.root, ctx.config.clone())?;
    if let Some(baseline) = baseline {
        migrator = migrator.baseline(baseline);
    }
    Ok(migrator)
}

/// Run the plan command
pub fn run_plan(
    ctx: &Context,
    template: &Path,
    baseline: Option<&Path>,
    out: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let report = migrator(ctx, baseline)?
        .dry_run(true)
        .run(&DirectoryTemplate::new(template), &AssumeYes)?;

    if let Outcome::Aborted { phase, reason } = &report.outcome {
        return Err(CliError::user(format!("Planning stopped during {phase}: {reason}")));
    }
    let Some(plan) = report.plan else {
        return Err(CliError::user("No plan was produced"));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let document = render_plan(&plan);
    match out {
        Some(path) => {
            hq_fs::io::write_text(path, &document)?;
            println!(
                "{} Wrote plan to {} ({} changes)",
                "OK".green().bold(),
                path.display(),
                plan.summary.total_changes
            );
        }
        None => print!("{document}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_test_utils::sample::{installation_v1, template_v2};

    #[test]
    fn plan_written_to_file() {
        let local = installation_v1();
        let template = template_v2();
        let ctx = Context::load(local.root(), None, None).unwrap();
        let out = local.join("MIGRATION.md");

        run_plan(&ctx, template.root(), None, Some(&out), false).unwrap();

        local.assert_file_contains("MIGRATION.md", "## Files to Update");
        local.assert_file_contains("MIGRATION.md", "`docs/handbook.md` -> `knowledge/public/handbook.md`");
        local.assert_not_exists(".hq-backup");
    }

    #[test]
    fn missing_template_is_an_error() {
        let local = installation_v1();
        let ctx = Context::load(local.root(), None, None).unwrap();
        assert!(run_plan(&ctx, &local.join("nope"), None, None, false).is_err());
    }
}
