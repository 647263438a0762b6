//! Read-only filesystem view
//!
//! The version oracle inspects an installation only through this trait, so it
//! can be exercised against an in-memory tree without touching a real disk.
//! All paths are relative to the view's root and use forward slashes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::path::normalize_relative;
use crate::{Error, Result};

/// Minimal read-only filesystem interface.
pub trait FileSystem {
    /// True if anything (file, directory, or symlink) exists at `path`.
    fn file_exists(&self, path: &str) -> bool;

    /// True if `path` itself is a symlink.
    fn is_symlink(&self, path: &str) -> bool;

    /// Read a file as UTF-8 text.
    fn read_file(&self, path: &str) -> Result<String>;

    /// Names of the direct children of a directory, sorted.
    fn list_dir(&self, path: &str) -> Result<Vec<String>>;

    /// True if `path` is a directory (following symlinks).
    fn is_dir(&self, path: &str) -> bool;
}

/// [`FileSystem`] backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let rel = normalize_relative(path);
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }
}

impl FileSystem for DiskFs {
    fn file_exists(&self, path: &str) -> bool {
        fs::symlink_metadata(self.resolve(path)).is_ok()
    }

    fn is_symlink(&self, path: &str) -> bool {
        fs::symlink_metadata(self.resolve(path))
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn read_file(&self, path: &str) -> Result<String> {
        let full = self.resolve(path);
        fs::read_to_string(&full).map_err(|e| Error::io(full, e))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let full = self.resolve(path);
        let mut names = Vec::new();
        for entry in fs::read_dir(&full).map_err(|e| Error::io(&full, e))? {
            let entry = entry.map_err(|e| Error::io(&full, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }
}

/// In-memory [`FileSystem`] for tests.
///
/// Directories are implied by the files and symlinks beneath them and can also
/// be declared explicitly.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: BTreeMap<String, String>,
    symlinks: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with text content.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        let path = normalize_relative(path);
        self.add_parents(&path);
        self.files.insert(path, content.to_string());
        self
    }

    /// Add an empty directory.
    pub fn with_dir(mut self, path: &str) -> Self {
        let path = normalize_relative(path);
        self.add_parents(&path);
        self.dirs.insert(path);
        self
    }

    /// Add a symlink. A symlink to a directory is reported by `is_dir`.
    pub fn with_symlink(mut self, path: &str, target: &str) -> Self {
        let path = normalize_relative(path);
        self.add_parents(&path);
        self.symlinks.insert(path, target.to_string());
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut current = path;
        while let Some(idx) = current.rfind('/') {
            current = &current[..idx];
            self.dirs.insert(current.to_string());
        }
    }
}

impl FileSystem for MemoryFs {
    fn file_exists(&self, path: &str) -> bool {
        let path = normalize_relative(path);
        self.files.contains_key(&path)
            || self.symlinks.contains_key(&path)
            || self.dirs.contains(&path)
    }

    fn is_symlink(&self, path: &str) -> bool {
        self.symlinks.contains_key(&normalize_relative(path))
    }

    fn read_file(&self, path: &str) -> Result<String> {
        let path = normalize_relative(path);
        self.files.get(&path).cloned().ok_or_else(|| {
            Error::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            )
        })
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize_relative(path);
        if !path.is_empty() && !self.dirs.contains(&path) {
            return Err(Error::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            ));
        }
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let children: BTreeSet<String> = self
            .files
            .keys()
            .chain(self.symlinks.keys())
            .chain(self.dirs.iter())
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty())
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
            .collect();
        Ok(children.into_iter().collect())
    }

    fn is_dir(&self, path: &str) -> bool {
        let path = normalize_relative(path);
        self.dirs.contains(&path) || self.symlinks.contains_key(&path)
    }
}
