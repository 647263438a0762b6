//! Template sources.

use std::path::{Path, PathBuf};

use hq_fs::IgnoreSet;
use tempfile::TempDir;

use crate::backup::platform_copier;
use crate::{Error, Result};

/// A fetched template tree.
///
/// When the tree was staged into a temporary directory, this value owns it and
/// dropping it deletes the tree.
#[derive(Debug)]
pub struct FetchedTemplate {
    root: PathBuf,
    _staging: Option<TempDir>,
}

impl FetchedTemplate {
    /// A tree used where it lies; nothing is cleaned up.
    pub fn borrowed(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _staging: None,
        }
    }

    /// A tree living in `staging`, removed on drop.
    pub fn staged(staging: TempDir) -> Self {
        Self {
            root: staging.path().to_path_buf(),
            _staging: Some(staging),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Produces the template tree a migration targets.
pub trait TemplateProvider {
    fn fetch(&self) -> Result<FetchedTemplate>;

    /// Shown in logs and reports.
    fn describe(&self) -> String;
}

/// A template checked out in a local directory.
///
/// By default the tree is copied into a temporary directory first, so edits to
/// the source during a migration cannot change what is applied.
#[derive(Debug, Clone)]
pub struct DirectoryTemplate {
    path: PathBuf,
    in_place: bool,
}

impl DirectoryTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            in_place: false,
        }
    }

    /// Read the directory directly instead of staging a copy.
    pub fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }
}

impl TemplateProvider for DirectoryTemplate {
    fn fetch(&self) -> Result<FetchedTemplate> {
        if !self.path.is_dir() {
            return Err(Error::TemplateFetch {
                message: format!("{} is not a directory", self.path.display()),
            });
        }
        if self.in_place {
            return Ok(FetchedTemplate::borrowed(&self.path));
        }

        let staging = TempDir::with_prefix("hq-template-")?;
        let stats = platform_copier().copy_tree(&self.path, staging.path(), &IgnoreSet::new([".git/"]))?;
        if !stats.failures.is_empty() {
            return Err(Error::TemplateFetch {
                message: format!(
                    "{} paths could not be staged, first: {}",
                    stats.failures.len(),
                    stats.failures[0].0
                ),
            });
        }
        tracing::debug!(
            "Staged template {} into {} ({} files)",
            self.path.display(),
            staging.path().display(),
            stats.file_count
        );
        Ok(FetchedTemplate::staged(staging))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_test_utils::TestTree;

    #[test]
    fn staged_copy_is_removed_on_drop() {
        let source = TestTree::new()
            .file("a.md", "a")
            .file(".git/HEAD", "ref");

        let fetched = DirectoryTemplate::new(source.root()).fetch().unwrap();
        let staged_root = fetched.root().to_path_buf();
        assert!(staged_root.join("a.md").is_file());
        assert!(!staged_root.join(".git").exists());

        drop(fetched);
        assert!(!staged_root.exists());
        assert!(source.exists("a.md"));
    }

    #[test]
    fn in_place_uses_the_source() {
        let source = TestTree::new().file("a.md", "a");
        let fetched = DirectoryTemplate::new(source.root()).in_place().fetch().unwrap();
        assert_eq!(fetched.root(), source.root());
    }

    #[test]
    fn missing_directory_is_a_fetch_error() {
        let source = TestTree::new();
        let err = DirectoryTemplate::new(source.join("nope")).fetch().unwrap_err();
        assert!(matches!(err, Error::TemplateFetch { .. }));
    }
}
