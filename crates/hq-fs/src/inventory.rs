//! Tree inventory
//!
//! Walks a directory tree into a map of forward-slash relative paths to
//! [`FileEntry`] metadata. Symlinks are recorded, never followed. Entries are
//! immutable snapshots consumed by a single diff pass.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::checksum::compute_file_checksum;
use crate::constants::HqPath;
use crate::path::{extension, file_name, to_slash};
use crate::{Error, Result};

/// Number of leading bytes inspected for a NUL when sniffing binaries.
pub const BINARY_SNIFF_BYTES: usize = 8192;

/// Extensions classified as binary without reading content.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "ico", "bmp", "tiff", "pdf", "zip", "gz", "tgz", "tar",
    "bz2", "xz", "7z", "rar", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "wav", "ogg",
    "mov", "avi", "webm", "exe", "dll", "so", "dylib", "bin", "db", "sqlite", "jar", "class",
    "pyc", "wasm",
];

/// Patterns ignored on both sides of every diff.
pub const DEFAULT_IGNORE: &[&str] = &[
    ".git/",
    "node_modules/",
    ".hq-backup/",
    "*.log",
    "*.pyc",
    ".DS_Store",
    "Thumbs.db",
    ".env",
];

/// Kind of an inventoried path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Symlink,
    /// Only empty directories are inventoried; others are implied by their children.
    Directory,
}

/// One inventoried path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: String,
    pub kind: EntryKind,
    /// Byte size; 0 for symlinks and directories
    pub size: u64,
    /// `sha256:<hex>` of the full content; regular files only
    pub hash: Option<String>,
    pub symlink_target: Option<String>,
    pub is_binary: bool,
    pub is_gitkeep: bool,
}

impl FileEntry {
    /// Build a regular-file entry from known content. Used by tests and fixtures.
    pub fn file(relative_path: &str, content: &[u8]) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            kind: EntryKind::File,
            size: content.len() as u64,
            hash: Some(crate::checksum::compute_bytes_checksum(content)),
            symlink_target: None,
            is_binary: is_binary_path(relative_path) || content.contains(&0),
            is_gitkeep: file_name(relative_path) == HqPath::Gitkeep.as_str(),
        }
    }

    /// Build a symlink entry.
    pub fn symlink(relative_path: &str, target: &str) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            kind: EntryKind::Symlink,
            size: 0,
            hash: None,
            symlink_target: Some(target.to_string()),
            is_binary: false,
            is_gitkeep: false,
        }
    }

    pub fn extension(&self) -> Option<String> {
        extension(&self.relative_path)
    }
}

/// Compiled ignore patterns.
///
/// Precedence: directory patterns (`name/`) match that directory anywhere and
/// everything under it; extension patterns (`*.ext`) match by suffix anywhere;
/// any other pattern is an exact name matched only at the tree root.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    dirs: Vec<String>,
    extensions: Vec<String>,
    root_names: Vec<String>,
}

impl IgnoreSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for pattern in patterns {
            set.add(pattern.as_ref());
        }
        set
    }

    /// The built-in ignore set.
    pub fn standard() -> Self {
        Self::new(DEFAULT_IGNORE)
    }

    pub fn add(&mut self, pattern: &str) {
        let pattern = pattern.replace('\\', "/");
        if let Some(dir) = pattern.strip_suffix('/') {
            self.dirs.push(dir.trim_start_matches('/').to_string());
        } else if let Some(ext) = pattern.strip_prefix("*.") {
            self.extensions.push(format!(".{ext}"));
        } else if !pattern.is_empty() {
            self.root_names.push(pattern.trim_start_matches('/').to_string());
        }
    }

    /// Whether a relative path is ignored.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        let path = relative_path.replace('\\', "/");
        let path = path.trim_matches('/');
        if path.is_empty() {
            return false;
        }
        let components: Vec<&str> = path.split('/').collect();

        for dir in &self.dirs {
            if dir.contains('/') {
                if path == dir || path.starts_with(&format!("{dir}/")) {
                    return true;
                }
                continue;
            }
            if let Some((last, parents)) = components.split_last()
                && (parents.contains(&dir.as_str()) || (is_dir && *last == dir.as_str()))
            {
                return true;
            }
        }

        if !is_dir && self.extensions.iter().any(|ext| path.ends_with(ext.as_str())) {
            return true;
        }

        components.len() == 1 && self.root_names.iter().any(|name| name == path)
    }
}

/// Result of a tree walk.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Root the entries are relative to
    pub root: PathBuf,
    pub entries: BTreeMap<String, FileEntry>,
    /// Paths that could not be inventoried, with the reason
    pub skipped: Vec<(String, String)>,
}

impl Inventory {
    /// Build an inventory from prepared entries.
    pub fn from_entries(root: impl Into<PathBuf>, entries: impl IntoIterator<Item = FileEntry>) -> Self {
        Self {
            root: root.into(),
            entries: entries
                .into_iter()
                .map(|e| (e.relative_path.clone(), e))
                .collect(),
            skipped: Vec::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of regular files.
    pub fn file_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.kind == EntryKind::File)
            .count()
    }

    /// Absolute location of an inventoried path.
    pub fn absolute(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }
}

/// Directory walker producing [`Inventory`] values.
pub struct TreeInventory;

impl TreeInventory {
    /// Walk `root`, skipping anything matched by `ignore`.
    ///
    /// A file that cannot be read or hashed is logged and recorded in
    /// [`Inventory::skipped`]; the walk continues.
    pub fn walk(root: &Path, ignore: &IgnoreSet) -> Result<Inventory> {
        if !root.is_dir() {
            return Err(Error::Walk {
                root: root.to_path_buf(),
                message: "not a directory".into(),
            });
        }

        let mut inventory = Inventory {
            root: root.to_path_buf(),
            ..Inventory::default()
        };

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                let rel = e.path().strip_prefix(root).map(to_slash).unwrap_or_default();
                !ignore.is_ignored(&rel, e.file_type().is_dir())
            });

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(to_slash).unwrap_or_default();
                    tracing::warn!("Skipping unreadable path {}: {}", path, e);
                    inventory.skipped.push((path, e.to_string()));
                    continue;
                }
            };

            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) => to_slash(rel),
                Err(_) => continue,
            };

            match inventory_entry(entry.path(), &relative, entry.file_type()) {
                Ok(Some(file_entry)) => {
                    inventory.entries.insert(relative, file_entry);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", relative, e);
                    inventory.skipped.push((relative, e.to_string()));
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            entries = inventory.entries.len(),
            skipped = inventory.skipped.len(),
            "Inventoried tree"
        );
        Ok(inventory)
    }
}

fn inventory_entry(
    path: &Path,
    relative: &str,
    file_type: fs::FileType,
) -> std::io::Result<Option<FileEntry>> {
    if file_type.is_symlink() {
        let target = fs::read_link(path)?;
        return Ok(Some(FileEntry::symlink(relative, &to_slash(target))));
    }

    if file_type.is_dir() {
        if fs::read_dir(path)?.next().is_some() {
            return Ok(None);
        }
        return Ok(Some(FileEntry {
            relative_path: relative.to_string(),
            kind: EntryKind::Directory,
            size: 0,
            hash: None,
            symlink_target: None,
            is_binary: false,
            is_gitkeep: false,
        }));
    }

    let size = fs::symlink_metadata(path)?.len();
    let hash = compute_file_checksum(path)?;
    Ok(Some(FileEntry {
        relative_path: relative.to_string(),
        kind: EntryKind::File,
        size,
        hash: Some(hash),
        symlink_target: None,
        is_binary: is_binary_file(path, relative)?,
        is_gitkeep: file_name(relative) == HqPath::Gitkeep.as_str(),
    }))
}

/// Extension-only binary check.
pub fn is_binary_path(relative_path: &str) -> bool {
    extension(relative_path)
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Binary check: known extension, else a NUL within the first 8 KiB.
pub fn is_binary_file(path: &Path, relative_path: &str) -> std::io::Result<bool> {
    if is_binary_path(relative_path) {
        return Ok(true);
    }
    let mut buf = [0u8; BINARY_SNIFF_BYTES];
    let mut file = fs::File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        let read = file.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(buf[..filled].contains(&0))
}
