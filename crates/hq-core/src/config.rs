//! Migration settings
//!
//! Read from `.hq-migrate.toml` at the installation root when present. Every
//! field has a default, so a partial file (or none) is valid.

use std::path::{Path, PathBuf};

use hq_fs::{ConfigStore, HqPath, IgnoreSet};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    /// Backup root, relative to the installation root unless absolute
    pub backup_dir: PathBuf,
    /// Fraction of failed items in one phase that halts the migration
    pub failure_threshold: f64,
    /// Fewer regular files than this in the template aborts before mutation
    pub min_template_files: usize,
    /// Ignore patterns added to the standard set
    pub extra_ignore: Vec<String>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(HqPath::BackupDir.as_str()),
            failure_threshold: 0.3,
            min_template_files: 5,
            extra_ignore: Vec::new(),
        }
    }
}

impl MigrateConfig {
    /// Load the config file under `root`, falling back to defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(HqPath::MigrateConfig.as_str());
        let config: Self = ConfigStore::new().load_or_default(&path)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded migrate config");
        Ok(config)
    }

    /// Absolute backup root for an installation.
    pub fn backup_root(&self, root: &Path) -> PathBuf {
        if self.backup_dir.is_absolute() {
            self.backup_dir.clone()
        } else {
            root.join(&self.backup_dir)
        }
    }

    /// Standard ignore set plus configured extras.
    pub fn ignore_set(&self) -> IgnoreSet {
        let mut set = IgnoreSet::standard();
        for pattern in &self.extra_ignore {
            set.add(pattern);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = MigrateConfig::load(dir.path()).unwrap();
        assert_eq!(config, MigrateConfig::default());
        assert_eq!(config.backup_root(dir.path()), dir.path().join(".hq-backup"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".hq-migrate.toml"),
            "failure_threshold = 0.5\nextra_ignore = [\"scratch/\"]\n",
        )
        .unwrap();

        let config = MigrateConfig::load(dir.path()).unwrap();

        assert_eq!(config.failure_threshold, 0.5);
        assert_eq!(config.min_template_files, 5);
        assert!(config.ignore_set().is_ignored("scratch/notes.md", false));
    }
}
