//! Symlink-preserving tree copy, one implementation per platform.
//!
//! The copier is picked once with [`platform_copier`] and handed to the
//! [`BackupManager`](super::BackupManager); nothing re-detects the platform
//! per call.

use std::fmt;
use std::fs;
use std::path::Path;

use hq_fs::path::to_slash;
use hq_fs::{IgnoreSet, io};
use walkdir::WalkDir;

/// Counts and per-path failures of one tree copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub file_count: usize,
    pub symlink_count: usize,
    pub total_size_bytes: u64,
    /// `(relative path, reason)` for every entry that could not be copied
    pub failures: Vec<(String, String)>,
    pub warnings: Vec<String>,
}

impl CopyStats {
    pub fn attempted(&self) -> usize {
        self.file_count + self.symlink_count + self.failures.len()
    }
}

/// Copies a directory tree without dereferencing symlinks.
pub trait TreeCopier: fmt::Debug + Send + Sync {
    /// Recorded in the manifest's `backupMethod`.
    fn method(&self) -> &'static str;

    /// Recreate the symlink at `src` at `dest`.
    fn copy_link(&self, src: &Path, dest: &Path, stats: &mut CopyStats) -> hq_fs::Result<()>;

    /// Copy everything under `src` not matched by `skip` into `dest`.
    ///
    /// Regular files keep permissions and modification times. A failing entry
    /// is recorded in [`CopyStats::failures`] and the copy continues.
    fn copy_tree(&self, src: &Path, dest: &Path, skip: &IgnoreSet) -> hq_fs::Result<CopyStats> {
        fs::create_dir_all(dest).map_err(|e| hq_fs::Error::io(dest, e))?;
        let mut stats = CopyStats::default();

        let walker = WalkDir::new(src)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                let rel = e.path().strip_prefix(src).map(to_slash).unwrap_or_default();
                !skip.is_ignored(&rel, e.file_type().is_dir())
            });

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    let rel = e
                        .path()
                        .and_then(|p| p.strip_prefix(src).ok())
                        .map(to_slash)
                        .unwrap_or_default();
                    stats.failures.push((rel, e.to_string()));
                    continue;
                }
            };
            let Ok(rel) = entry.path().strip_prefix(src) else {
                continue;
            };
            let target = dest.join(rel);
            let file_type = entry.file_type();

            let result = if file_type.is_symlink() {
                self.copy_link(entry.path(), &target, &mut stats)
            } else if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| hq_fs::Error::io(&target, e))
            } else {
                io::copy_preserving(entry.path(), &target).map(|bytes| {
                    stats.file_count += 1;
                    stats.total_size_bytes += bytes;
                })
            };

            if let Err(e) = result {
                let rel = to_slash(rel);
                tracing::warn!("Failed to copy {}: {}", rel, e);
                stats.failures.push((rel, e.to_string()));
            }
        }

        tracing::debug!(
            method = self.method(),
            files = stats.file_count,
            symlinks = stats.symlink_count,
            failures = stats.failures.len(),
            "Copied tree"
        );
        Ok(stats)
    }
}

/// POSIX copy: symlinks recreated verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixCopier;

impl TreeCopier for PosixCopier {
    fn method(&self) -> &'static str {
        "posix-walk"
    }

    fn copy_link(&self, src: &Path, dest: &Path, stats: &mut CopyStats) -> hq_fs::Result<()> {
        io::copy_symlink(src, dest)?;
        stats.symlink_count += 1;
        Ok(())
    }
}

/// Windows copy: creating symlinks may need privileges the process lacks. A
/// link that cannot be recreated is copied as the file it points to, with a
/// warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsCopier;

impl TreeCopier for WindowsCopier {
    fn method(&self) -> &'static str {
        "windows-walk"
    }

    fn copy_link(&self, src: &Path, dest: &Path, stats: &mut CopyStats) -> hq_fs::Result<()> {
        match io::copy_symlink(src, dest) {
            Ok(()) => {
                stats.symlink_count += 1;
                Ok(())
            }
            Err(link_err) if src.is_file() => {
                let bytes = io::copy_preserving(src, dest)?;
                stats.file_count += 1;
                stats.total_size_bytes += bytes;
                stats.warnings.push(format!(
                    "{} copied as a regular file: {link_err}",
                    src.display()
                ));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// The copier for the running platform.
pub fn platform_copier() -> Box<dyn TreeCopier> {
    if cfg!(windows) {
        Box::new(WindowsCopier)
    } else {
        Box::new(PosixCopier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_test_utils::TestTree;

    fn skip_git() -> IgnoreSet {
        IgnoreSet::new([".git/"])
    }

    #[test]
    fn copies_files_and_counts_bytes() {
        let src = TestTree::new()
            .file("a.md", "12345")
            .file("nested/b.md", "123")
            .file(".git/HEAD", "ref")
            .dir("empty");
        let dest = TestTree::new();

        let stats = PosixCopier
            .copy_tree(src.root(), &dest.join("out"), &skip_git())
            .unwrap();

        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size_bytes, 8);
        assert!(stats.failures.is_empty());
        assert_eq!(dest.read("out/nested/b.md"), "123");
        assert!(dest.join("out/empty").is_dir());
        assert!(!dest.exists("out/.git"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_stay_symlinks() {
        let src = TestTree::new()
            .file("real/skill.md", "x")
            .symlink("link", "real");
        let dest = TestTree::new();

        let stats = PosixCopier
            .copy_tree(src.root(), dest.root(), &skip_git())
            .unwrap();

        assert_eq!(stats.symlink_count, 1);
        assert_eq!(stats.file_count, 1);
        let meta = fs::symlink_metadata(dest.join("link")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(dest.join("link")).unwrap(), Path::new("real"));
    }

    #[test]
    fn platform_copier_is_selected_once() {
        let copier = platform_copier();
        assert!(["posix-walk", "windows-walk"].contains(&copier.method()));
    }
}
