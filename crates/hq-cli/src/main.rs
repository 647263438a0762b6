//! hq-migrate CLI
//!
//! Detects the installed version, plans and applies template migrations, and
//! manages the backups they take.

mod cli;
mod commands;
mod context;
mod error;
mod interactive;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        println!("{} Safe upgrades for HQ installations", "hq-migrate".green().bold());
        println!();
        println!("Run {} for available commands.", "hq-migrate --help".cyan());
        return Ok(());
    };

    let cwd = std::env::current_dir()?;
    let ctx = Context::load(&cwd, cli.root.as_deref(), cli.backup_dir.as_deref())?;
    execute_command(&ctx, command)
}

fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Detect { json } => commands::run_detect(ctx, json),
        Commands::Plan {
            template,
            baseline,
            out,
            json,
        } => commands::run_plan(ctx, &template, baseline.as_deref(), out.as_ref(), json),
        Commands::Migrate {
            template,
            baseline,
            dry_run,
            yes,
            json,
        } => commands::run_migrate(ctx, &template, baseline.as_deref(), dry_run, yes, json),
        Commands::Backup => commands::run_backup(ctx),
        Commands::ListBackups { json } => commands::run_list_backups(ctx, json),
        Commands::Verify { backup } => commands::run_verify(ctx, &backup),
        Commands::Restore { backup, yes } => commands::run_restore(ctx, backup.as_deref(), yes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_test_utils::sample::{installation_v1, template_v2};

    #[test]
    fn test_cli_error_user() {
        let error = error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn execute_detect_then_plan() {
        let local = installation_v1();
        let template = template_v2();
        let ctx = Context::load(local.root(), None, None).unwrap();

        execute_command(&ctx, Commands::Detect { json: true }).unwrap();
        execute_command(
            &ctx,
            Commands::Plan {
                template: template.root().to_path_buf(),
                baseline: None,
                out: Some(local.join("plan.md")),
                json: false,
            },
        )
        .unwrap();

        local.assert_file_contains("plan.md", "# Migration Plan");
    }
}
