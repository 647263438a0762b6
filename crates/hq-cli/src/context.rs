//! Installation context
//!
//! Finds the installation root from any directory inside it, the way `git`
//! finds its repository, and loads its migration settings.

use std::path::{Path, PathBuf};

use hq_core::MigrateConfig;
use hq_fs::HqPath;

use crate::error::{CliError, Result};

/// Files whose presence marks an installation root.
const ROOT_MARKERS: &[HqPath] = &[HqPath::VersionMarker, HqPath::CoreInstructions, HqPath::MigrateConfig];

/// Nearest ancestor of `start` (inclusive) holding a root marker.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|m| dir.join(m.as_str()).exists()))
        .map(Path::to_path_buf)
}

/// Root and settings for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub root: PathBuf,
    pub config: MigrateConfig,
}

impl Context {
    /// Resolve the root and load its config.
    ///
    /// An explicit root is used as given. Otherwise the nearest installation
    /// around `cwd` is used, falling back to `cwd` itself so that version
    /// inference still works on an unmarked tree.
    pub fn load(cwd: &Path, explicit_root: Option<&Path>, backup_dir: Option<&Path>) -> Result<Self> {
        let root = match explicit_root {
            Some(root) => cwd.join(root),
            None => find_root(cwd).unwrap_or_else(|| cwd.to_path_buf()),
        };
        if !root.is_dir() {
            return Err(CliError::user(format!(
                "Installation root {} is not a directory",
                root.display()
            )));
        }

        let mut config = MigrateConfig::load(&root)?;
        if let Some(dir) = backup_dir {
            config.backup_dir = cwd.join(dir);
        }
        tracing::debug!(root = %root.display(), "Resolved installation root");
        Ok(Self { root, config })
    }

    pub fn backup_root(&self) -> PathBuf {
        self.config.backup_root(&self.root)
    }
}
