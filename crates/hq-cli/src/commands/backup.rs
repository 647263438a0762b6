//! Backup, list-backups, verify and restore commands

use colored::Colorize;
use hq_core::backup::{RestoreStatus, VerificationStatus};
use hq_core::{BackupManager, VersionOracle};
use hq_fs::DiskFs;
use serde_json::json;

use crate::context::Context;
use crate::error::{CliError, Result};
use crate::interactive;

fn manager(ctx: &Context) -> BackupManager {
    BackupManager::with_platform_copier(&ctx.root, ctx.backup_root())
}

fn status_label(status: VerificationStatus) -> colored::ColoredString {
    match status {
        VerificationStatus::Verified => status.to_string().green().bold(),
        VerificationStatus::WithinTolerance => status.to_string().yellow().bold(),
        VerificationStatus::Mismatch => status.to_string().red().bold(),
    }
}

/// Run the backup command
pub fn run_backup(ctx: &Context) -> Result<()> {
    let version = VersionOracle::new(&DiskFs::new(&ctx.root)).detect();
    let backup = manager(ctx).snapshot(&version.version_string())?;

    println!("{}: {}", "Backup".dimmed(), backup.dir.display());
    println!(
        "{}:  {} files, {} symlinks, {}",
        "Size".dimmed(),
        backup.manifest.file_count,
        backup.manifest.symlink_count,
        backup.manifest.total_size_human
    );
    for warning in &backup.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    for (path, reason) in &backup.failures {
        println!("  {} {}: {}", "x".red(), path, reason);
    }
    println!("{}: {}", "Status".dimmed(), status_label(backup.verification.status));

    if !backup.failures.is_empty() {
        return Err(CliError::user(format!(
            "{} of {} entries could not be backed up",
            backup.failures.len(),
            backup.attempted
        )));
    }
    if !backup.verification.is_ok() {
        return Err(CliError::user(format!(
            "Backup holds {} entries, the installation has {}",
            backup.verification.actual, backup.verification.expected
        )));
    }
    Ok(())
}

/// Run the list-backups command
pub fn run_list_backups(ctx: &Context, json: bool) -> Result<()> {
    let backups = manager(ctx).list_backups()?;

    if json {
        let entries: Vec<_> = backups
            .iter()
            .map(|b| json!({ "name": b.name, "path": b.dir, "manifest": b.manifest }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if backups.is_empty() {
        println!(
            "{} in {} (use {} to create one)",
            "No backups".dimmed(),
            ctx.backup_root().display(),
            "hq-migrate backup".cyan()
        );
        return Ok(());
    }
    println!("{}:", "Backups".bold());
    for info in &backups {
        println!("  {}", interactive::backup_label(info));
    }
    Ok(())
}

/// Run the verify command
pub fn run_verify(ctx: &Context, backup: &str) -> Result<()> {
    let manager = manager(ctx);
    let dir = manager.resolve_backup(backup)?;
    let verification = manager.verify(&dir)?;

    println!(
        "{} expected {}, found {} ({:+})",
        status_label(verification.status),
        verification.expected,
        verification.actual,
        verification.difference
    );
    if !verification.is_ok() {
        return Err(CliError::user(format!("Backup {} failed verification", dir.display())));
    }
    Ok(())
}

/// Run the restore command
pub fn run_restore(ctx: &Context, backup: Option<&str>, yes: bool) -> Result<()> {
    let manager = manager(ctx);
    let dir = match backup {
        Some(name) => manager.resolve_backup(name)?,
        None => interactive::select_backup(&manager.list_backups()?)?
            .ok_or_else(|| CliError::user("No backups to restore"))?,
    };

    if !yes
        && !interactive::confirm(&format!(
            "Restore {} over {}? Files added since are kept.",
            dir.display(),
            ctx.root.display()
        ))?
    {
        println!("{} Cancelled.", "NOTE".yellow().bold());
        return Ok(());
    }

    let report = manager.restore(&dir)?;
    for (path, reason) in &report.failures {
        println!("  {} {}: {}", "FAIL".red().bold(), path, reason);
    }
    let status = match report.verification.status {
        RestoreStatus::Match => report.verification.status.to_string().green().bold(),
        RestoreStatus::Mismatch => report.verification.status.to_string().red().bold(),
    };
    println!(
        "{} Restored {} entries from {} ({} expected {}, found {})",
        "OK".green().bold(),
        report.restored,
        dir.display(),
        status,
        report.verification.expected,
        report.verification.actual
    );
    Ok(())
}
