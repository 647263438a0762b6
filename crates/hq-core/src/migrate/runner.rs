//! The phase runner.

use std::fs;
use std::path::{Path, PathBuf};

use hq_content::MergeEngine;
use hq_fs::{DiskFs, EntryKind, Inventory, TreeInventory, io};

use super::{
    AppliedChange, Confirm, MigrationReport, Outcome, PathIssue, Phase, TemplateProvider,
};
use crate::backup::{BackupManager, TreeCopier, platform_copier};
use crate::config::MigrateConfig;
use crate::diff::DiffEngine;
use crate::plan::{PlanAction, PlanBuilder, PlanEntry};
use crate::registry::StrategyRegistry;
use crate::version::VersionOracle;
use crate::{Error, Result};

/// Apply groups, in the order they run.
const APPLY_ORDER: [PlanAction; 4] = [
    PlanAction::Update,
    PlanAction::Add,
    PlanAction::Move,
    PlanAction::Remove,
];

enum Step {
    Applied,
    Skipped(String),
}

/// Both inventories plus the backup the apply phase writes into.
struct ApplyContext<'a> {
    template: &'a Inventory,
    local: &'a Inventory,
    backup_dir: &'a Path,
}

/// Migrates one installation root.
#[derive(Debug)]
pub struct Migrator {
    root: PathBuf,
    config: MigrateConfig,
    registry: StrategyRegistry,
    baseline: Option<PathBuf>,
    dry_run: bool,
    backups: BackupManager,
}

impl Migrator {
    pub fn new(root: impl Into<PathBuf>, config: MigrateConfig) -> Result<Self> {
        let root = root.into();
        let backups = BackupManager::new(&root, config.backup_root(&root), platform_copier());
        Ok(Self {
            registry: StrategyRegistry::builtin()?,
            baseline: None,
            dry_run: false,
            backups,
            config,
            root,
        })
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Template the installation was created from; enables DELETED detection.
    pub fn baseline(mut self, dir: impl Into<PathBuf>) -> Self {
        self.baseline = Some(dir.into());
        self
    }

    /// Stop after planning.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn copier(mut self, copier: Box<dyn TreeCopier>) -> Self {
        self.backups = BackupManager::new(&self.root, self.config.backup_root(&self.root), copier);
        self
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Run every phase against the template `provider` produces.
    ///
    /// Errors are returned only for failures before the installation is read
    /// (missing root, unavailable template, unreadable tree). Every later stop
    /// is reported through [`MigrationReport::outcome`].
    pub fn run(&self, provider: &dyn TemplateProvider, confirm: &dyn Confirm) -> Result<MigrationReport> {
        if !self.root.is_dir() {
            return Err(Error::NotAnInstallation {
                path: self.root.clone(),
            });
        }
        let mut report = MigrationReport::new(provider.describe());

        let detected = VersionOracle::new(&DiskFs::new(&self.root)).detect();
        report.from_version = detected.version_string();
        if !detected.clues.is_empty() {
            tracing::debug!(clues = ?detected.clues, "Version inferred");
        }
        report.complete(Phase::Detect);

        // The staged template lives until this function returns.
        let template = provider.fetch()?;
        let ignore = self.config.ignore_set();
        let template_inv = TreeInventory::walk(template.root(), &ignore)?;
        let found = template_inv.file_count();
        if found < self.config.min_template_files {
            let reason = Error::TemplateTooSmall {
                path: template.root().to_path_buf(),
                found,
                minimum: self.config.min_template_files,
            };
            return Ok(report.finish(Outcome::Aborted {
                phase: Phase::Inventory,
                reason: reason.to_string(),
            }));
        }
        report.to_version = VersionOracle::new(&DiskFs::new(template.root()))
            .detect()
            .version_string();
        let local_inv = TreeInventory::walk(&self.root, &ignore)?;
        for (path, reason) in local_inv.skipped.iter().chain(&template_inv.skipped) {
            report.warnings.push(format!("Not inventoried: {path}: {reason}"));
        }
        report.complete(Phase::Inventory);

        let mut engine = DiffEngine::new(self.registry.clone());
        if let Some(baseline) = &self.baseline {
            engine = engine.with_baseline(TreeInventory::walk(baseline, &ignore)?);
        }
        let diff = engine.categorize(&template_inv, &local_inv);
        report.complete(Phase::Diff);

        let plan = PlanBuilder::new(&self.registry)
            .local(&local_inv)
            .versions(report.from_version.clone(), report.to_version.clone())
            .build(&diff);
        report.plan = Some(plan.clone());
        report.complete(Phase::Plan);

        if !plan.has_changes() {
            return Ok(report.finish(Outcome::UpToDate));
        }
        if self.dry_run {
            return Ok(report.finish(Outcome::DryRun));
        }

        if !confirm.confirm(&plan) {
            return Ok(report.finish(Outcome::Declined));
        }
        report.complete(Phase::Confirm);

        let backup = match self.backups.snapshot(&report.from_version) {
            Ok(backup) => backup,
            Err(e) => {
                return Ok(report.finish(Outcome::Aborted {
                    phase: Phase::Backup,
                    reason: e.to_string(),
                }));
            }
        };
        report.backup_dir = Some(backup.dir.clone());
        report.warnings.extend(backup.warnings.iter().cloned());
        // Apply may only run over a backup holding every entry.
        if !backup.failures.is_empty() {
            for (path, reason) in &backup.failures {
                report.warnings.push(format!("Not backed up: {path}: {reason}"));
            }
            let reason = Error::BackupIncomplete {
                failed: backup.failures.len(),
                attempted: backup.attempted,
            };
            return Ok(report.finish(Outcome::Aborted {
                phase: Phase::Backup,
                reason: reason.to_string(),
            }));
        }
        if !backup.verification.is_ok() {
            let reason = Error::VerificationFailed {
                expected: backup.verification.expected,
                actual: backup.verification.actual,
            };
            return Ok(report.finish(Outcome::Aborted {
                phase: Phase::Backup,
                reason: reason.to_string(),
            }));
        }
        report.complete(Phase::Backup);

        let ctx = ApplyContext {
            template: &template_inv,
            local: &local_inv,
            backup_dir: &backup.dir,
        };
        let mut attempted = 0usize;
        for action in APPLY_ORDER {
            for entry in plan.entries_for(action) {
                attempted += 1;
                match self.apply_entry(&ctx, entry, &mut report.warnings) {
                    Ok(Step::Applied) => {
                        tracing::debug!("{} {}", entry.action, entry.path);
                        report.applied.push(AppliedChange {
                            path: entry.path.clone(),
                            action: entry.action,
                            old_path: entry.old_path.clone(),
                        });
                    }
                    Ok(Step::Skipped(reason)) => {
                        tracing::info!("Left {} untouched: {}", entry.path, reason);
                        report.skipped.push(PathIssue::new(&entry.path, reason));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to {} {}: {}", entry.action, entry.path, e);
                        report.failed.push(PathIssue::new(&entry.path, e.to_string()));
                    }
                }
            }

            let failed = report.failed.len();
            if attempted > 0 && failed as f64 / attempted as f64 > self.config.failure_threshold {
                return Ok(report.finish(Outcome::CriticalFailure {
                    phase: Phase::Apply,
                    reason: format!("{failed} of {attempted} changes failed"),
                }));
            }
        }
        report.complete(Phase::Apply);

        let after = TreeInventory::walk(&self.root, &ignore)?;
        for change in &report.applied {
            let present = after.contains(&change.path);
            let expected = change.action != PlanAction::Remove;
            if present != expected {
                report.warnings.push(format!(
                    "{} {} did not take effect",
                    change.action, change.path
                ));
            }
        }
        report.complete(Phase::Verify);

        Ok(report.finish(Outcome::Completed))
    }

    fn apply_entry(&self, ctx: &ApplyContext<'_>, entry: &PlanEntry, warnings: &mut Vec<String>) -> Result<Step> {
        match entry.action {
            PlanAction::Update => self.apply_update(ctx, entry, warnings),
            PlanAction::Add => {
                self.install_from_template(ctx.template, &entry.path)?;
                Ok(Step::Applied)
            }
            PlanAction::Move => {
                let Some(old) = entry.old_path.as_deref() else {
                    return Ok(Step::Skipped("rename without a source path".into()));
                };
                io::move_path(&self.root.join(old), &self.root.join(&entry.path))?;
                Ok(Step::Applied)
            }
            PlanAction::Remove => {
                self.backups.archive_removed(ctx.backup_dir, &entry.path)?;
                Ok(Step::Applied)
            }
            PlanAction::Keep => Ok(Step::Skipped("nothing to do".into())),
        }
    }

    fn apply_update(&self, ctx: &ApplyContext<'_>, entry: &PlanEntry, warnings: &mut Vec<String>) -> Result<Step> {
        let strategy = &entry.strategy;
        let template_entry = ctx.template.get(&entry.path);
        let local_entry = ctx.local.get(&entry.path);

        if !strategy.is_default() {
            if template_entry.is_some_and(|e| e.is_binary) || local_entry.is_some_and(|e| e.is_binary) {
                warnings.push(format!(
                    "{} is binary; {} cannot merge it, left untouched",
                    entry.path, strategy
                ));
                return Ok(Step::Skipped(format!("binary file with {strategy} strategy")));
            }
            let regular = |e: Option<&hq_fs::FileEntry>| e.is_some_and(|e| e.kind == EntryKind::File);
            if !regular(template_entry) || !regular(local_entry) {
                return Ok(Step::Skipped(format!("{strategy} applies to regular files only")));
            }
        }

        // No safety copy, no write.
        if let Err(e) = self.backups.backup_modified_original(ctx.backup_dir, &entry.path) {
            return Err(Error::BackupFailed {
                path: self.root.join(&entry.path),
                message: format!("original not saved, file left untouched: {e}"),
            });
        }

        if strategy.is_default() {
            self.install_from_template(ctx.template, &entry.path)?;
            return Ok(Step::Applied);
        }

        let dest = self.root.join(&entry.path);
        let template_text = io::read_text(&ctx.template.absolute(&entry.path))?;
        let local_text = io::read_text(&dest)?;
        let outcome = MergeEngine::new().merge(strategy, &template_text, &local_text);
        warnings.extend(outcome.warnings.iter().map(|w| format!("{}: {w}", entry.path)));

        if !outcome.success {
            return Err(Error::MergeFailed {
                path: entry.path.clone(),
                reason: outcome.warnings.join("; "),
            });
        }
        if outcome.merged == local_text {
            return Ok(Step::Skipped("local content kept".into()));
        }
        io::write_text(&dest, &outcome.merged)?;
        Ok(Step::Applied)
    }

    /// Copy one template path into the installation, replacing what is there.
    fn install_from_template(&self, template: &Inventory, rel: &str) -> Result<()> {
        let src = template.absolute(rel);
        let dest = self.root.join(rel);
        let kind = template.get(rel).map_or(EntryKind::File, |e| e.kind);

        if kind == EntryKind::Directory {
            fs::create_dir_all(&dest).map_err(|e| hq_fs::Error::io(&dest, e))?;
            return Ok(());
        }
        // Writing through an existing link would change its target instead.
        if dest.is_symlink() || dest.is_dir() {
            io::remove_path(&dest)?;
        }
        match kind {
            EntryKind::Symlink => io::copy_symlink(&src, &dest)?,
            _ => {
                io::copy_preserving(&src, &dest)?;
            }
        }
        Ok(())
    }
}
