//! [`TestTree`] builder for installation and template fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use hq_fs::{IgnoreSet, Inventory, TreeInventory};
use tempfile::TempDir;

/// A temporary directory tree with helpers for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use hq_test_utils::TestTree;
///
/// let tree = TestTree::new()
///     .file(".hq-version", "1.0.0\n")
///     .file("workers/dev/worker.yaml", "id: dev\n");
/// tree.assert_file_contains(".hq-version", "1.0.0");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the tree.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Add a file, creating parent directories.
    pub fn file(self, relative: &str, content: impl AsRef<[u8]>) -> Self {
        self.write(relative, content);
        self
    }

    /// Add an empty directory.
    pub fn dir(self, relative: &str) -> Self {
        fs::create_dir_all(self.join(relative)).unwrap();
        self
    }

    /// Add a symlink at `relative` pointing at `target` (stored verbatim).
    #[cfg(unix)]
    pub fn symlink(self, relative: &str, target: &str) -> Self {
        let link = self.join(relative);
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        std::os::unix::fs::symlink(target, &link).unwrap();
        self
    }

    /// Write or replace a file after construction.
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        let path = self.join(relative);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Could not read {}: {e}", path.display()))
    }

    pub fn exists(&self, relative: &str) -> bool {
        fs::symlink_metadata(self.join(relative)).is_ok()
    }

    /// Inventory with the standard ignore set.
    pub fn inventory(&self) -> Inventory {
        TreeInventory::walk(self.root(), &IgnoreSet::standard()).unwrap()
    }

    /// Assert that `relative` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, relative: &str) {
        assert!(
            self.exists(relative),
            "Expected path to exist: {}",
            self.join(relative).display()
        );
    }

    /// Assert that `relative` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_not_exists(&self, relative: &str) {
        assert!(
            !self.exists(relative),
            "Expected path NOT to exist: {}",
            self.join(relative).display()
        );
    }

    /// Assert that the file at `relative` contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, relative: &str, content: &str) {
        let actual = self.read(relative);
        assert!(
            actual.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            relative,
            content,
            actual
        );
    }
}
