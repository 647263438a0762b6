//! Snapshot, verify, list and restore backups of an installation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use hq_fs::path::to_slash;
use hq_fs::{HqPath, IgnoreSet, io};
use walkdir::WalkDir;

use super::copier::{TreeCopier, platform_copier};
use super::manifest::{
    BackupManifest, EXCLUDED_DIRS, ManifestInput, Platform, RestoreVerification, Verification,
    generate_manifest, parse_manifest, validate_manifest, verify_backup, verify_restore,
};
use crate::{Error, Result};

const NAME_FORMAT: &str = "%Y%m%d-%H%M%S";
const MAX_NAME_SUFFIX: usize = 100;

/// A completed snapshot.
///
/// `verification` compares files and symlinks found under the installation
/// against those present in the mirror, so anything the copier dropped shows
/// up as a shortfall.
#[derive(Debug, Clone)]
pub struct Backup {
    pub dir: PathBuf,
    pub manifest: BackupManifest,
    pub verification: Verification,
    /// `(relative path, reason)` for every entry missing from the mirror
    pub failures: Vec<(String, String)>,
    /// Entries the copier tried to copy, failed ones included
    pub attempted: usize,
    /// Copied, but not as-is (a link stored as its target file)
    pub warnings: Vec<String>,
}

impl Backup {
    /// Every entry copied and the mirror count within tolerance.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.verification.is_ok()
    }
}

/// One retained backup, as listed.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub name: String,
    pub dir: PathBuf,
    pub manifest: BackupManifest,
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub backup_dir: PathBuf,
    pub restored: usize,
    pub failures: Vec<(String, String)>,
    pub verification: RestoreVerification,
}

/// Owns backups of one installation root.
#[derive(Debug)]
pub struct BackupManager {
    root: PathBuf,
    backup_root: PathBuf,
    copier: Box<dyn TreeCopier>,
    excluded: Vec<String>,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>, copier: Box<dyn TreeCopier>) -> Self {
        let root = root.into();
        let backup_root = backup_root.into();
        let mut excluded: Vec<String> = EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect();
        // A configured backup root inside the installation must never copy itself.
        if let Ok(rel) = backup_root.strip_prefix(&root) {
            let rel = to_slash(rel);
            if !rel.is_empty() && !excluded.contains(&rel) {
                excluded.push(rel);
            }
        }
        Self {
            root,
            backup_root,
            copier,
            excluded,
        }
    }

    /// Manager using the copier for the running platform.
    pub fn with_platform_copier(root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        Self::new(root, backup_root, platform_copier())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    fn exclusions(&self) -> IgnoreSet {
        IgnoreSet::new(self.excluded.iter().map(|d| format!("{d}/")))
    }

    /// Copy the installation into a new timestamped backup directory and write
    /// its manifest.
    pub fn snapshot(&self, hq_version: &str) -> Result<Backup> {
        if !self.root.is_dir() {
            return Err(Error::NotAnInstallation {
                path: self.root.clone(),
            });
        }
        let timestamp = Utc::now();
        let dir = create_backup_dir(&self.backup_root, &timestamp.format(NAME_FORMAT).to_string())?;
        tracing::info!("Creating backup in {}", dir.display());

        let exclusions = self.exclusions();
        let expected = source_counts(&self.root, &exclusions).entries();
        let stats = self
            .copier
            .copy_tree(&self.root, &dir, &exclusions)
            .map_err(|e| Error::BackupFailed {
                path: dir.clone(),
                message: e.to_string(),
            })?;

        let manifest = generate_manifest(ManifestInput {
            timestamp,
            hq_version: hq_version.to_string(),
            hq_path: self.root.display().to_string(),
            file_count: stats.file_count,
            symlink_count: stats.symlink_count,
            total_size_bytes: stats.total_size_bytes,
            excluded_dirs: self.excluded.clone(),
            platform: Platform::current(),
            backup_method: self.copier.method().to_string(),
        });

        let validation = validate_manifest(&serde_json::to_value(&manifest)?);
        if !validation.is_valid() {
            if let Err(e) = io::remove_path(&dir) {
                tracing::warn!("Could not remove rejected backup {}: {}", dir.display(), e);
            }
            return Err(Error::InvalidManifest {
                path: dir,
                errors: validation.errors,
            });
        }

        let json = serde_json::to_string_pretty(&manifest)?;
        io::write_atomic(&dir.join(HqPath::BackupManifest.as_str()), json.as_bytes())?;

        let verification = verify_backup(expected, mirror_counts(&dir).entries());
        let attempted = stats.attempted();
        for (path, reason) in &stats.failures {
            tracing::warn!("Not backed up: {}: {}", path, reason);
        }
        tracing::info!(
            files = manifest.file_count,
            symlinks = manifest.symlink_count,
            failures = stats.failures.len(),
            size = %manifest.total_size_human,
            status = %verification.status,
            "Backup complete"
        );

        Ok(Backup {
            dir,
            manifest,
            verification,
            failures: stats.failures,
            attempted,
            warnings: stats.warnings,
        })
    }

    /// Recount a backup's mirrored files against its manifest.
    pub fn verify(&self, backup_dir: &Path) -> Result<Verification> {
        let manifest = load_manifest(backup_dir)?;
        Ok(verify_backup(manifest.file_count, mirror_counts(backup_dir).files))
    }

    /// Retained backups, newest first. Directories without a valid manifest
    /// are skipped.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let read = match fs::read_dir(&self.backup_root) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(hq_fs::Error::io(&self.backup_root, e).into()),
        };

        let mut dirs: Vec<(String, PathBuf)> = read
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .collect();
        dirs.sort_by(|a, b| b.0.cmp(&a.0));

        let mut backups = Vec::with_capacity(dirs.len());
        for (name, dir) in dirs {
            match load_manifest(&dir) {
                Ok(manifest) => backups.push(BackupInfo { name, dir, manifest }),
                Err(e) => tracing::warn!("Skipping backup {}: {}", name, e),
            }
        }
        Ok(backups)
    }

    /// Accept a backup directory name under the backup root, or a path.
    pub fn resolve_backup(&self, name_or_path: &str) -> Result<PathBuf> {
        let as_path = PathBuf::from(name_or_path);
        let candidates = [self.backup_root.join(name_or_path), as_path];
        candidates
            .into_iter()
            .find(|dir| dir.join(HqPath::BackupManifest.as_str()).is_file())
            .ok_or_else(|| Error::BackupNotFound {
                path: self.backup_root.join(name_or_path),
            })
    }

    /// Copy a backup's mirrored tree back over the installation root.
    ///
    /// Files created after the backup are left alone, and the backup itself is
    /// never removed.
    pub fn restore(&self, backup_dir: &Path) -> Result<RestoreReport> {
        let manifest = load_manifest(backup_dir)?;
        tracing::info!(
            "Restoring {} (taken {}) into {}",
            backup_dir.display(),
            manifest.timestamp,
            self.root.display()
        );

        let read = fs::read_dir(backup_dir).map_err(|e| hq_fs::Error::io(backup_dir, e))?;
        let mut restored = 0;
        let mut failures = Vec::new();

        for entry in read.filter_map(|entry| entry.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_backup_metadata(&name) {
                continue;
            }
            let src = entry.path();
            let dest = self.root.join(&name);
            let Ok(file_type) = entry.file_type() else {
                failures.push((name, "unreadable entry".to_string()));
                continue;
            };

            if file_type.is_dir() {
                match self.copier.copy_tree(&src, &dest, &IgnoreSet::default()) {
                    Ok(stats) => {
                        restored += stats.file_count + stats.symlink_count;
                        failures.extend(
                            stats
                                .failures
                                .into_iter()
                                .map(|(path, reason)| (format!("{name}/{path}"), reason)),
                        );
                    }
                    Err(e) => failures.push((name, e.to_string())),
                }
                continue;
            }

            let mut link_stats = Default::default();
            let result = if file_type.is_symlink() {
                self.copier.copy_link(&src, &dest, &mut link_stats)
            } else {
                io::copy_preserving(&src, &dest).map(|_| ())
            };
            match result {
                Ok(()) => restored += 1,
                Err(e) => failures.push((name, e.to_string())),
            }
        }

        for (path, reason) in &failures {
            tracing::warn!("Failed to restore {}: {}", path, reason);
        }

        let verification = verify_restore(manifest.file_count, source_counts(&self.root, &self.exclusions()).files);
        tracing::info!(restored, status = %verification.status, "Restore complete");

        Ok(RestoreReport {
            backup_dir: backup_dir.to_path_buf(),
            restored,
            failures,
            verification,
        })
    }

    /// Save the current content of `rel` into the backup's `modified/` area.
    pub fn backup_modified_original(&self, backup_dir: &Path, rel: &str) -> Result<PathBuf> {
        let src = self.root.join(rel);
        let dest = backup_dir.join(HqPath::ModifiedDir.as_str()).join(rel);
        if src.is_symlink() {
            io::copy_symlink(&src, &dest)?;
        } else {
            io::copy_preserving(&src, &dest)?;
        }
        tracing::debug!("Saved original of {} to {}", rel, dest.display());
        Ok(dest)
    }

    /// Move `rel` out of the installation into the backup's `removed/` area.
    pub fn archive_removed(&self, backup_dir: &Path, rel: &str) -> Result<PathBuf> {
        let dest = backup_dir.join(HqPath::RemovedDir.as_str()).join(rel);
        io::move_path(&self.root.join(rel), &dest)?;
        tracing::debug!("Archived {} to {}", rel, dest.display());
        Ok(dest)
    }
}

/// Read and validate the manifest sidecar of a backup directory.
pub fn load_manifest(backup_dir: &Path) -> Result<BackupManifest> {
    let path = backup_dir.join(HqPath::BackupManifest.as_str());
    if !path.is_file() {
        return Err(Error::BackupNotFound {
            path: backup_dir.to_path_buf(),
        });
    }
    let json = io::read_text(&path)?;
    parse_manifest(&json).map_err(|validation| Error::InvalidManifest {
        path,
        errors: validation.errors,
    })
}

/// Create `stamp`, or `stamp-N` if a backup with that name already exists.
fn create_backup_dir(backup_root: &Path, stamp: &str) -> Result<PathBuf> {
    let failed = |path: &Path, e: std::io::Error| Error::BackupFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    fs::create_dir_all(backup_root).map_err(|e| failed(backup_root, e))?;

    for n in 0..MAX_NAME_SUFFIX {
        let name = if n == 0 {
            stamp.to_string()
        } else {
            format!("{stamp}-{n}")
        };
        let dir = backup_root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(failed(&dir, e)),
        }
    }
    Err(Error::BackupFailed {
        path: backup_root.join(stamp),
        message: "too many backups with the same timestamp".into(),
    })
}

fn is_backup_metadata(top_level_name: &str) -> bool {
    [HqPath::BackupManifest, HqPath::ModifiedDir, HqPath::RemovedDir]
        .iter()
        .any(|p| p.as_str() == top_level_name)
}

#[derive(Debug, Default, Clone, Copy)]
struct TreeCount {
    files: usize,
    symlinks: usize,
}

impl TreeCount {
    fn entries(self) -> usize {
        self.files + self.symlinks
    }

    fn tally(walker: impl Iterator<Item = walkdir::Result<walkdir::DirEntry>>) -> Self {
        walker.filter_map(|e| e.ok()).fold(Self::default(), |mut count, e| {
            let file_type = e.file_type();
            if file_type.is_symlink() {
                count.symlinks += 1;
            } else if file_type.is_file() {
                count.files += 1;
            }
            count
        })
    }
}

/// Files and symlinks of the mirrored tree, excluding the manifest and the
/// `modified/` and `removed/` areas.
fn mirror_counts(backup_dir: &Path) -> TreeCount {
    TreeCount::tally(
        WalkDir::new(backup_dir)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.depth() != 1 || !is_backup_metadata(&e.file_name().to_string_lossy())),
    )
}

/// Files and symlinks under `root` that a copy with `skip` would visit.
fn source_counts(root: &Path, skip: &IgnoreSet) -> TreeCount {
    TreeCount::tally(
        WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                let rel = e.path().strip_prefix(root).map(to_slash).unwrap_or_default();
                !skip.is_ignored(&rel, e.file_type().is_dir())
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{CopyStats, PosixCopier};
    use crate::backup::manifest::{RestoreStatus, VerificationStatus};
    use hq_test_utils::TestTree;

    fn installation() -> TestTree {
        TestTree::new()
            .file(".hq-version", "1.0.0\n")
            .file(".claude/CLAUDE.md", "# HQ\n")
            .file("workers/dev/worker.yaml", "id: dev\n")
            .file(".git/HEAD", "ref: main\n")
            .file("node_modules/x/index.js", "")
    }

    fn manager(tree: &TestTree) -> BackupManager {
        BackupManager::new(tree.root(), tree.join(".hq-backup"), Box::new(PosixCopier))
    }

    /// Copies files but cannot create any symlink.
    #[derive(Debug)]
    struct NoLinkCopier;

    impl TreeCopier for NoLinkCopier {
        fn method(&self) -> &'static str {
            "no-links"
        }

        fn copy_link(&self, _src: &Path, dest: &Path, _stats: &mut CopyStats) -> hq_fs::Result<()> {
            Err(hq_fs::Error::io(dest, ErrorKind::PermissionDenied.into()))
        }
    }

    #[test]
    fn snapshot_writes_verified_manifest() {
        let tree = installation();
        let backup = manager(&tree).snapshot("1.0.0").unwrap();

        assert_eq!(backup.manifest.file_count, 3);
        assert_eq!(backup.verification.status, VerificationStatus::Verified);
        assert_eq!(backup.attempted, 3);
        assert!(backup.is_complete());
        assert_eq!(backup.manifest.backup_method, "posix-walk");
        assert!(backup.dir.join("backup-manifest.json").is_file());
        assert!(backup.dir.join("workers/dev/worker.yaml").is_file());
        assert!(!backup.dir.join(".git").exists());
        assert!(!backup.dir.join("node_modules").exists());
        assert!(!backup.dir.join(".hq-backup").exists());
    }

    #[test]
    fn custom_backup_root_inside_installation_is_excluded() {
        let tree = installation();
        let manager = BackupManager::new(tree.root(), tree.join("var/backups"), Box::new(PosixCopier));

        let backup = manager.snapshot("1.0.0").unwrap();

        assert!(backup.manifest.excluded_dirs.contains(&"var/backups".to_string()));
        assert!(!backup.dir.join("var/backups").exists());
    }

    #[test]
    fn empty_installation_is_rejected() {
        let tree = TestTree::new().dir("workers");
        let err = manager(&tree).snapshot("unknown").unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { .. }), "{err}");
        assert!(manager(&tree).list_backups().unwrap().is_empty());
    }

    #[test]
    fn colliding_names_get_a_suffix() {
        let tree = TestTree::new();
        let root = tree.join("backups");
        let first = create_backup_dir(&root, "20260101-120000").unwrap();
        let second = create_backup_dir(&root, "20260101-120000").unwrap();
        assert!(first.ends_with("20260101-120000"));
        assert!(second.ends_with("20260101-120000-1"));
    }

    #[test]
    fn verify_detects_missing_mirror_files() {
        let tree = TestTree::new()
            .file("a.md", "a")
            .file("b.md", "b")
            .file("c.md", "c")
            .file("d.md", "d");
        let manager = manager(&tree);
        let backup = manager.snapshot("1.0.0").unwrap();

        for name in ["a.md", "b.md", "c.md"] {
            fs::remove_file(backup.dir.join(name)).unwrap();
        }

        let verification = manager.verify(&backup.dir).unwrap();
        assert_eq!(verification.status, VerificationStatus::Mismatch);
        assert_eq!(verification.difference, -3);
    }

    #[cfg(unix)]
    #[test]
    fn dropped_links_fail_the_snapshot() {
        let mut tree = installation();
        for n in 0..8 {
            tree = tree.symlink(&format!("links/l{n}"), "../workers");
        }
        let manager = BackupManager::new(tree.root(), tree.join(".hq-backup"), Box::new(NoLinkCopier));

        let backup = manager.snapshot("1.0.0").unwrap();

        assert_eq!(backup.failures.len(), 8);
        assert_eq!(backup.attempted, 11);
        assert_eq!(backup.verification.expected, 11);
        assert_eq!(backup.verification.actual, 3);
        assert_eq!(backup.verification.status, VerificationStatus::Mismatch);
        assert!(!backup.is_complete());
    }

    #[test]
    fn list_is_newest_first_and_skips_invalid() {
        let tree = installation()
            .file(".hq-backup/20250101-000000/backup-manifest.json", "{}")
            .file(".hq-backup/20240101-000000/notes.md", "no manifest");
        let manager = manager(&tree);
        let backup = manager.snapshot("1.0.0").unwrap();

        let listed = manager.list_backups().unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].dir, backup.dir);
        assert_eq!(
            manager.resolve_backup(&listed[0].name).unwrap(),
            backup.dir
        );
        assert!(manager.resolve_backup("19990101-000000").is_err());
    }

    #[test]
    fn restore_overwrites_and_keeps_new_files() {
        let tree = installation();
        let manager = manager(&tree);
        let backup = manager.snapshot("1.0.0").unwrap();

        fs::write(tree.join(".claude/CLAUDE.md"), "# broken\n").unwrap();
        fs::write(tree.join("later.md"), "created after backup\n").unwrap();
        manager.backup_modified_original(&backup.dir, ".claude/CLAUDE.md").unwrap();

        let report = manager.restore(&backup.dir).unwrap();

        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.restored, 3);
        assert_eq!(report.verification.status, RestoreStatus::Match);
        assert_eq!(tree.read(".claude/CLAUDE.md"), "# HQ\n");
        assert!(tree.exists("later.md"));
        assert!(!tree.exists("modified"));
        assert!(backup.dir.join("backup-manifest.json").is_file());
    }

    #[test]
    fn modified_and_removed_areas() {
        let tree = installation().file("docs/old.md", "old\n");
        let manager = manager(&tree);
        let backup = manager.snapshot("1.0.0").unwrap();

        let saved = manager
            .backup_modified_original(&backup.dir, "workers/dev/worker.yaml")
            .unwrap();
        let archived = manager.archive_removed(&backup.dir, "docs/old.md").unwrap();

        assert_eq!(saved, backup.dir.join("modified/workers/dev/worker.yaml"));
        assert_eq!(fs::read_to_string(archived).unwrap(), "old\n");
        assert!(!tree.exists("docs/old.md"));
        assert_eq!(
            manager.verify(&backup.dir).unwrap().status,
            VerificationStatus::Verified
        );
    }
}
