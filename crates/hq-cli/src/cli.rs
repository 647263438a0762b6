//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// hq-migrate - Upgrade an HQ installation to a newer template without losing your work
#[derive(Parser, Debug)]
#[command(name = "hq-migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Installation root (defaults to the nearest enclosing installation)
    #[arg(short = 'C', long, global = true, env = "HQ_ROOT")]
    pub root: Option<PathBuf>,

    /// Backup root, overriding `.hq-migrate.toml`
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Report the installed version and how it was determined
    Detect {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Compare the installation with a template and write the migration plan
    ///
    /// Examples:
    ///   hq-migrate plan -t ../hq-template
    ///   hq-migrate plan -t ../hq-template -o MIGRATION.md
    Plan {
        /// Template directory
        #[arg(short, long, env = "HQ_TEMPLATE")]
        template: PathBuf,

        /// Template the installation was created from (enables deletions)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Write the markdown plan to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output the plan as JSON
        #[arg(long, conflicts_with = "out")]
        json: bool,
    },

    /// Back up the installation and apply the template
    ///
    /// Examples:
    ///   hq-migrate migrate -t ../hq-template --dry-run
    ///   hq-migrate migrate -t ../hq-template --yes
    Migrate {
        /// Template directory
        #[arg(short, long, env = "HQ_TEMPLATE")]
        template: PathBuf,

        /// Template the installation was created from (enables deletions)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Stop after planning; write nothing
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take a backup of the installation now
    Backup,

    /// List retained backups, newest first
    ListBackups {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Recount a backup's files against its manifest
    Verify {
        /// Backup directory name or path
        backup: String,
    },

    /// Restore a backup over the installation
    ///
    /// Files created after the backup are kept. Without BACKUP, choose one
    /// interactively.
    Restore {
        /// Backup directory name or path
        backup: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_no_args() {
        let cli = Cli::parse_from(["hq-migrate"]);
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["hq-migrate", "detect", "-v", "-C", "/srv/hq"]);
        assert!(cli.verbose);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/hq")));
        assert_eq!(cli.command, Some(Commands::Detect { json: false }));
    }

    #[test]
    fn parse_migrate() {
        let cli = Cli::parse_from([
            "hq-migrate",
            "migrate",
            "--template",
            "../tpl",
            "--dry-run",
            "-y",
            "--backup-dir",
            "/backups",
        ]);
        assert_eq!(cli.backup_dir, Some(PathBuf::from("/backups")));
        assert_eq!(
            cli.command,
            Some(Commands::Migrate {
                template: PathBuf::from("../tpl"),
                baseline: None,
                dry_run: true,
                yes: true,
                json: false,
            })
        );
    }

    #[test]
    fn plan_out_and_json_conflict() {
        let result = Cli::try_parse_from(["hq-migrate", "plan", "-t", "x", "-o", "p.md", "--json"]);
        assert!(result.is_err());
    }

    #[test]
    fn restore_backup_is_optional() {
        let cli = Cli::parse_from(["hq-migrate", "restore"]);
        assert_eq!(
            cli.command,
            Some(Commands::Restore {
                backup: None,
                yes: false
            })
        );
    }
}
