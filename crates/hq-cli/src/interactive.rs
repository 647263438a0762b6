//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal-based confirmation and selection.

use std::path::PathBuf;

use colored::Colorize;
use dialoguer::{Confirm, Select};
use hq_core::{BackupInfo, Plan};

use crate::error::Result;

/// Asks on the terminal before a migration writes anything.
///
/// A prompt that cannot be shown (no terminal) counts as a refusal.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl hq_core::Confirm for TerminalConfirm {
    fn confirm(&self, plan: &Plan) -> bool {
        let s = &plan.summary;
        println!();
        println!(
            "{} {} to update, {} to add, {} to move, {} to remove",
            "Pending:".bold(),
            s.modified.to_string().cyan(),
            s.new.to_string().cyan(),
            s.renamed.to_string().cyan(),
            s.deleted.to_string().cyan()
        );
        let high = plan.high_impact().count();
        if high > 0 {
            println!("{} {} high-impact changes", "!".yellow().bold(), high);
        }

        match confirm("Back up and apply these changes?") {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }
}

/// Yes/no prompt defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Pick one backup from a listing; `None` when the listing is empty.
pub fn select_backup(backups: &[BackupInfo]) -> Result<Option<PathBuf>> {
    if backups.is_empty() {
        return Ok(None);
    }
    let items: Vec<String> = backups.iter().map(backup_label).collect();
    let idx = Select::new()
        .with_prompt("Backup to restore")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(Some(backups[idx].dir.clone()))
}

/// `20260301-123000  v1.2.0  412 files  3.1 MB`
pub fn backup_label(info: &BackupInfo) -> String {
    format!(
        "{}  v{}  {} files  {}",
        info.name, info.manifest.hq_version, info.manifest.file_count, info.manifest.total_size_human
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_core::backup::Platform;
    use hq_core::backup::manifest::{ManifestInput, generate_manifest};

    #[test]
    fn label_shows_version_and_size() {
        let manifest = generate_manifest(ManifestInput {
            timestamp: "2026-03-01T12:30:00Z".parse().unwrap(),
            hq_version: "1.2.0".into(),
            hq_path: "/home/me/hq".into(),
            file_count: 412,
            symlink_count: 0,
            total_size_bytes: 3_250_586,
            excluded_dirs: Vec::new(),
            platform: Platform::Linux,
            backup_method: "posix-walk".into(),
        });
        let info = BackupInfo {
            name: "20260301-123000".into(),
            dir: PathBuf::from("/home/me/hq/.hq-backup/20260301-123000"),
            manifest,
        };
        assert_eq!(backup_label(&info), "20260301-123000  v1.2.0  412 files  3.1 MB");
    }

    #[test]
    fn empty_listing_selects_nothing() {
        assert_eq!(select_backup(&[]).unwrap(), None);
    }
}
